//! Storage strategies for [`Slide`]s and the rotation cursor.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use crate::playlist::Slide;

/// A collection of slides together with the position of the last one handed out.
///
/// Implementations must keep the cursor usable after any mutation: the next
/// [`Slots::advance`] never points outside the collection.
pub trait Slots: Send {
    /// Inserts or overwrites a slide, returning the number of slides afterwards.
    fn put(&mut self, slide: Slide) -> usize;
    fn remove(&mut self, index: usize) -> Option<Slide>;
    /// Swaps the content for `slides`, which are already numbered from 0.
    fn replace(&mut self, slides: Vec<Slide>);
    fn clear(&mut self);
    /// Moves the cursor to the next slide and returns it.
    fn advance(&mut self) -> Option<Slide>;
    fn cursor(&self) -> Option<usize>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slides keyed by their index, rotation follows numeric order and skips gaps.
#[derive(Default)]
pub struct SparseSlots {
    items: BTreeMap<usize, Slide>,
    cursor: Option<usize>,
}

impl Slots for SparseSlots {
    fn put(&mut self, slide: Slide) -> usize {
        self.items.insert(slide.index, slide);
        self.items.len()
    }

    // The cursor may now name a missing key, `advance` scans past it.
    fn remove(&mut self, index: usize) -> Option<Slide> {
        let removed = self.items.remove(&index);
        if self.items.is_empty() {
            self.cursor = None;
        }
        removed
    }

    fn replace(&mut self, slides: Vec<Slide>) {
        self.items = slides
            .into_iter()
            .map(|slide| (slide.index, slide))
            .collect();
        self.cursor = None;
    }

    fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    fn advance(&mut self) -> Option<Slide> {
        let next = match self.cursor {
            Some(cursor) => self
                .items
                .range((Excluded(cursor), Unbounded))
                .next()
                .or_else(|| self.items.first_key_value()),
            None => self.items.first_key_value(),
        }
        .map(|(_, slide)| slide.clone())?;
        self.cursor = Some(next.index);
        Some(next)
    }

    fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Slides in a sequence, a slide's index is its position.
///
/// Putting an index past the end appends, so the sequence never has holes.
#[derive(Default)]
pub struct DenseSlots {
    items: Vec<Slide>,
    cursor: Option<usize>,
}

impl Slots for DenseSlots {
    fn put(&mut self, mut slide: Slide) -> usize {
        if let Some(existing) = self.items.get_mut(slide.index) {
            *existing = slide;
        } else {
            slide.index = self.items.len();
            self.items.push(slide);
        }
        self.items.len()
    }

    fn remove(&mut self, index: usize) -> Option<Slide> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        for (position, slide) in self.items.iter_mut().enumerate().skip(index) {
            slide.index = position;
        }
        // Keep pointing just before whatever followed the removed slide
        self.cursor = match self.cursor {
            _ if self.items.is_empty() => None,
            Some(cursor) if index < cursor => Some(cursor - 1),
            Some(cursor) if index == cursor => cursor.checked_sub(1),
            other => other,
        };
        Some(removed)
    }

    fn replace(&mut self, slides: Vec<Slide>) {
        self.items = slides;
        self.cursor = None;
    }

    fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    fn advance(&mut self) -> Option<Slide> {
        if self.items.is_empty() {
            return None;
        }
        let position = match self.cursor {
            Some(cursor) => (cursor + 1) % self.items.len(),
            None => 0,
        };
        self.cursor = Some(position);
        self.items.get(position).cloned()
    }

    fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
