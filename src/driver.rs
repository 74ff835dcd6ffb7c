//! Spider used by the `run` command: requests from a file, pages to the log

use async_trait::async_trait;
use bytes::Bytes;
use crawlbox::request::{CanonicalRequest, HeadersMap, RequestDescriptor};
use crawlbox::{Dispatcher, HandlerError, Spider, ValidationOutcome};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Reads one descriptor per line: a bare path or uri, a number, or a JSON object
pub struct FileSpider {
    input: PathBuf,
}

impl FileSpider {
    pub fn open(input: impl AsRef<Path>) -> io::Result<Self> {
        let input = input.as_ref().to_path_buf();
        File::open(&input)?;
        Ok(Self { input })
    }
}

#[async_trait]
impl Spider for FileSpider {
    fn requests(&self) -> Box<dyn Iterator<Item = RequestDescriptor> + '_> {
        match File::open(&self.input) {
            Ok(file) => Box::new(
                BufReader::new(file)
                    .lines()
                    .map_while(|line| match line {
                        Ok(line) => Some(line),
                        Err(e) => {
                            error!(error = %e, "Stopped reading request list");
                            None
                        }
                    })
                    .filter_map(|line| RequestDescriptor::parse_line(&line)),
            ),
            Err(e) => {
                error!(path = %self.input.display(), error = %e, "Cannot open request list");
                Box::new(std::iter::empty())
            }
        }
    }

    async fn on_success(
        &self,
        body: &Bytes,
        request: &CanonicalRequest,
        _dispatcher: &Dispatcher,
        headers: &HeadersMap,
    ) -> Result<Option<ValidationOutcome>, HandlerError> {
        info!(
            method = %request.method,
            uri = %request.uri,
            bytes = body.len(),
            content_type = headers.get("content-type").map(String::as_str).unwrap_or("-"),
            "Fetched page"
        );
        Ok(None)
    }

    async fn on_error(&self, request: &CanonicalRequest, message: &str, partial_body: Option<&Bytes>) {
        warn!(
            method = %request.method,
            uri = %request.uri,
            error = message,
            partial_bytes = partial_body.map_or(0, |b| b.len()),
            "Request abandoned"
        );
    }
}
