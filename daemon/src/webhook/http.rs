//! Just enough HTTP/1.1 for the webhook: one request per connection, bodies sized by
//! `Content-Length`.

use nom::bytes::complete::{tag, take_till, take_till1};
use nom::character::complete::{alpha1, char, line_ending, one_of, space0, space1};
use nom::combinator::map;
use nom::multi::many0;
use nom::{Finish, IResult, Parser};

use crate::webhook::RequestError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other(String),
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        match value {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

/// Request line and the headers we care about.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub content_length: usize,
    /// The client waits for `100 Continue` before sending the body.
    pub expect_continue: bool,
    pub chunked: bool,
}

fn parse_request_line(input: &str) -> IResult<&str, (Method, &str)> {
    let (input, method) = map(alpha1, Method::from).parse(input)?;
    let (input, _) = space1(input)?;
    let (input, path) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("HTTP/1.")(input)?;
    let (input, _) = one_of("01")(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, (method, path)))
}

fn parse_header(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, name) = take_till1(|c: char| c == ':' || c == '\r' || c == '\n')(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = space0(input)?;
    let (input, value) = take_till(|c: char| c == '\r' || c == '\n')(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, (name, value.trim_end())))
}

/// Parses everything up to and including the blank line ending the headers.
///
/// # Errors
/// Returns [`RequestError::Malformed`] if this is not an HTTP/1.x request head.
pub fn parse_head(input: &str) -> Result<RequestHead, RequestError> {
    let (_, ((method, path), headers, _)) = (parse_request_line, many0(parse_header), line_ending)
        .parse(input)
        .finish()
        .map_err(|_| RequestError::Malformed)?;

    let mut head = RequestHead {
        method,
        path: path.to_string(),
        content_length: 0,
        expect_continue: false,
        chunked: false,
    };
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse().map_err(|_| RequestError::Malformed)?;
        } else if name.eq_ignore_ascii_case("expect") {
            head.expect_continue = value.eq_ignore_ascii_case("100-continue");
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            head.chunked = value.to_ascii_lowercase().contains("chunked");
        }
    }
    Ok(head)
}

#[derive(Debug)]
pub struct Response {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Response {
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn individual_parsers() {
        assert_eq!(
            parse_request_line("POST /webhook HTTP/1.1\r\n"),
            Ok(("", (Method::Post, "/webhook")))
        );
        assert_eq!(
            parse_header("Content-Length:  42 \r\nrest"),
            Ok(("rest", ("Content-Length", "42")))
        );
        assert_eq!(parse_header("Host: localhost\n"), Ok(("", ("Host", "localhost"))));
        assert!(parse_request_line("POST /webhook HTTP/2\r\n").is_err());
    }

    #[test]
    fn parsing_head() {
        let head = "PUT /playlist HTTP/1.1\r\n\
                    Host: localhost:8081\r\n\
                    content-length: 1234\r\n\
                    Expect: 100-continue\r\n\
                    \r\n";
        assert_eq!(
            parse_head(head).unwrap(),
            RequestHead {
                method: Method::Put,
                path: "/playlist".to_string(),
                content_length: 1234,
                expect_continue: true,
                chunked: false,
            }
        );

        let head = "GET /status HTTP/1.0\n\n";
        let parsed = parse_head(head).unwrap();
        assert_eq!(parsed.method, Method::Get);
        assert_eq!(parsed.content_length, 0);

        let head = "PATCH /webhook HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n";
        let parsed = parse_head(head).unwrap();
        assert_eq!(parsed.method, Method::Other("PATCH".to_string()));
        assert!(parsed.chunked);
    }

    #[test]
    fn rejecting_garbage() {
        let malformed = |head: &str| matches!(parse_head(head), Err(RequestError::Malformed));
        assert!(malformed(""));
        assert!(malformed("hello there\r\n\r\n"));
        // Missing blank line
        assert!(malformed("GET /status HTTP/1.1\r\nHost: x\r\n"));
        assert!(malformed(
            "POST /webhook HTTP/1.1\r\nContent-Length: lots\r\n\r\n"
        ));
    }

    #[test]
    fn writing_response() {
        let response = Response::text(404, "no slide 3");
        assert_eq!(
            String::from_utf8(response.to_bytes()).unwrap(),
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain; charset=utf-8\r\n\
             Content-Length: 10\r\nConnection: close\r\n\r\nno slide 3"
        );
    }
}
