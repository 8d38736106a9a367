//! Do some preparations for integration tests
#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use slidecastd::Slide;
use slidecastd::display::{Display, DisplayError};

pub fn setup() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// A tiny PNG, base64 encoded.
pub fn encoded_png() -> String {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(2, 2)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("cannot encode test image");
    STANDARD.encode(bytes)
}

/// A display that only remembers what it was asked to show.
#[derive(Clone, Default)]
pub struct Recorder {
    pub shown: Arc<Mutex<Vec<Slide>>>,
}

impl Recorder {
    pub fn indices(&self) -> Vec<usize> {
        self.shown
            .lock()
            .expect("recorder poisoned")
            .iter()
            .map(Slide::index)
            .collect()
    }
}

impl Display for Recorder {
    fn name(&self) -> String {
        "recorder".to_string()
    }

    async fn show(&mut self, slide: &Slide) -> Result<(), DisplayError> {
        self.shown
            .lock()
            .expect("recorder poisoned")
            .push(slide.clone());
        Ok(())
    }

    async fn dismiss(&mut self) {}
}
