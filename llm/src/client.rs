use bytes::Bytes;
use futures::stream::Stream;
use futures::{
    StreamExt,
    stream::{self},
};
use reqwest::header::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, pin::Pin};
use tracing::{Level, event, instrument};

#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
}

pub type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

impl Client {
    pub fn with_headers(headers: HeaderMap) -> anyhow::Result<Self> {
        Ok(Client {
            client: reqwest::Client::builder().default_headers(headers).build()?,
        })
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn get<U, T>(&self, url: U) -> anyhow::Result<T>
    where
        U: reqwest::IntoUrl + Debug,
        T: DeserializeOwned,
    {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_body
            ));
        }
        let text = response.text().await?;
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str::<T>(&text)?)
    }

    #[instrument(level = "trace", skip(self, request, process))]
    pub async fn post_stream<U, S, F, T>(
        &self,
        url: U,
        request: &S,
        process: F,
    ) -> anyhow::Result<BoxedStream<anyhow::Result<T>>>
    where
        U: reqwest::IntoUrl + Debug,
        S: Serialize + Sized,
        T: DeserializeOwned + Send + 'static,
        F: Fn(&str) -> Option<&str> + 'static + Send,
    {
        let response = self.client.post(url).json(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_body
            ));
        }

        Ok(decode_stream(response.bytes_stream(), process))
    }
}

/// Splits a byte stream into newline-terminated lines.
///
/// Bytes are buffered until a full line is available, so multi-byte characters
/// split across network chunks decode correctly.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }
}

fn parse_line<T, F>(line: &str, process: &F) -> Option<T>
where
    T: DeserializeOwned,
    F: Fn(&str) -> Option<&str>,
{
    let payload = process(line)?;
    if payload.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<T>(payload) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(line = payload, error = %e, "Skipping unparseable stream event");
            None
        }
    }
}

/// Turn a raw byte stream into parsed events.
///
/// `process` selects the JSON payload of a line (e.g. strips `data: `) and
/// returns `None` for lines that carry no event. Read errors are yielded as
/// `Err` items.
pub(crate) fn decode_stream<B, E, F, T>(bytes: B, process: F) -> BoxedStream<anyhow::Result<T>>
where
    B: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    F: Fn(&str) -> Option<&str> + 'static + Send,
{
    let events = bytes.scan(LineBuffer::default(), move |buffer, chunk| {
        let items: Vec<anyhow::Result<T>> = match chunk {
            Ok(chunk) => buffer
                .push(&chunk)
                .iter()
                .filter_map(|line| parse_line(line, &process))
                .map(Ok)
                .collect(),
            Err(e) => vec![Err(anyhow::Error::new(e).context("Error reading response stream"))],
        };
        futures::future::ready(Some(items))
    });

    Box::pin(events.flat_map(stream::iter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Clone)]
    struct TestEvent {
        id: u32,
        text: String,
    }

    fn sse(line: &str) -> Option<&str> {
        line.strip_prefix("data: ")
    }

    async fn collect(chunks: Vec<&'static [u8]>) -> Vec<TestEvent> {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))).collect();
        decode_stream(stream::iter(chunks), sse)
            .map(|event| event.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_processing_complete_lines() {
        let results =
            collect(vec![&b"data: {\"id\":1,\"text\":\"hello\"}\ndata: {\"id\":2,\"text\":\"world\"}\n"[..]]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], TestEvent { id: 1, text: "hello".to_string() });
        assert_eq!(results[1], TestEvent { id: 2, text: "world".to_string() });
    }

    #[tokio::test]
    async fn test_stream_processing_split_across_chunks() {
        let results = collect(vec![
            &b"data: {\"id\":1,\"te"[..],
            &b"xt\":\"hello\"}\ndata: {\"id\":2"[..],
            &b",\"text\":\"world\"}\n"[..],
        ])
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[1], TestEvent { id: 2, text: "world".to_string() });
    }

    #[tokio::test]
    async fn test_stream_processing_split_multibyte_character() {
        // "é" is 0xC3 0xA9; split it between two chunks
        let results = collect(vec![
            &b"data: {\"id\":1,\"text\":\"caf\xC3"[..],
            &b"\xA9\"}\r\n\r\n"[..],
        ])
        .await;

        assert_eq!(results, vec![TestEvent { id: 1, text: "café".to_string() }]);
    }

    #[tokio::test]
    async fn test_stream_processing_incomplete_final_line() {
        let results =
            collect(vec![&b"data: {\"id\":1,\"text\":\"hello\"}\ndata: {\"id\":2,\"text\":\"incomplete"[..]]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[tokio::test]
    async fn test_stream_processing_skips_noise_and_malformed_json() {
        let results = collect(vec![
            &b"\ndata: {\"id\":1,\"text\":\"hello\"}\n\nevent: ping\ndata: {malformed json}\ndata: {\"id\":2,\"text\":\"world\"}\n"[..],
        ])
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 2);
    }

    #[tokio::test]
    async fn test_stream_processing_single_byte_chunks() {
        let data: &'static [u8] = b"data: {\"id\":1,\"text\":\"hello\"}\n";
        let chunks: Vec<Result<Bytes, std::io::Error>> = data
            .iter()
            .map(|&b| Ok(Bytes::from(vec![b])))
            .collect();
        let results: Vec<TestEvent> = decode_stream(stream::iter(chunks), sse)
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(results, vec![TestEvent { id: 1, text: "hello".to_string() }]);
    }

    #[tokio::test]
    async fn test_stream_read_error_is_yielded() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"id\":1,\"text\":\"hello\"}\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let results: Vec<anyhow::Result<TestEvent>> =
            decode_stream(stream::iter(chunks), sse).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("reset"));
    }

    #[test]
    fn test_line_buffer_keeps_partial_line() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"abc").is_empty());
        assert_eq!(buffer.push(b"def\nghi"), vec!["abcdef".to_string()]);
        assert_eq!(buffer.push(b"\n"), vec!["ghi".to_string()]);
    }
}
