use std::io::{BufRead, Read, Write};
use bufstream::BufStream;
use tracing::{debug, info, warn};
use super::content_manager::{ContentManager, ResolveError};
use super::http::{parse_request, BadRequest};
use super::response::{Response, Status};

const WRITE_BUFFER: usize = 8192;

/// Serves one connection: a single bounded read, one response, then the stream
/// is dropped. Returns the status that was sent.
pub fn handle_client<M, S>(stream: S, manager: &M, default_document: &str, read_limit: usize) -> Status
    where M: ContentManager + ?Sized, S: Read + Write {
    let mut buffed = BufStream::with_capacities(read_limit, WRITE_BUFFER, stream);

    let response = match buffed.fill_buf() {
        Ok(raw) => respond(raw, manager, default_document),
        Err(e) => {
            warn!("Error reading request:{}", e);
            Response::error(Status::InternalServerError)
        }
    };

    if let Err(e) = response.write_to(&mut buffed) {
        debug!("Error while writing response:{}", e);
    }
    response.status
}

fn respond<M: ContentManager + ?Sized>(raw: &[u8], manager: &M, default_document: &str) -> Response {
    let request = match parse_request(raw, default_document) {
        Ok(request) => request,
        Err(BadRequest::Malformed) => {
            info!(status = 400, "malformed request ({} bytes)", raw.len());
            return Response::error(Status::BadRequest);
        },
        Err(BadRequest::UnsupportedMethod(method)) => {
            info!(status = 400, %method, "unsupported method");
            return Response::error(Status::BadRequest);
        }
    };

    if let Some(agent) = request.headers.get("User-Agent") {
        debug!(user_agent = agent);
    }

    let response = match manager.find_content(&request.path) {
        Ok(resource) => Response::ok(resource),
        Err(ResolveError::NotFound) => Response::error(Status::NotFound),
        Err(e) => {
            warn!(path = %request.path, "{}", e);
            Response::error(Status::InternalServerError)
        }
    };
    info!(method = "GET", path = %request.path, status = response.status.code(), "served");
    response
}
