use std::io::{self, Write};
use chrono::Utc;
use super::content_manager::Resource;

pub const SERVER_NAME: &str = "pool-file-server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error"
        }
    }
}

pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>
}

impl Response {
    pub fn ok(resource: Resource) -> Response {
        Response {
            status: Status::Ok,
            content_type: resource.content_type,
            body: resource.content
        }
    }

    /// Canned HTML page for a non-200 outcome.
    pub fn error(status: Status) -> Response {
        Response {
            status,
            content_type: "text/html",
            body: format!("<h1>{} {}</h1>", status.code(), status.reason()).into_bytes()
        }
    }

    /// Status line, headers and body as one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Length: {}\r\n\
             Content-Type: {}\r\n\
             Connection: close\r\n\
             Date: {}\r\n\
             Server: {}\r\n\
             \r\n",
            self.status.code(),
            self.status.reason(),
            self.body.len(),
            self.content_type,
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT"),
            SERVER_NAME
        );
        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }
}
