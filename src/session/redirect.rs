//! One-shot listener for the backend's post-login redirect
//!
//! After the browser login completes, the backend redirects to
//! `http://localhost:<port>/?auth=success` or `?error=<message>`. The listener
//! answers exactly one request and then closes, so the signal is consumed once.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Result signalled by the backend's redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRedirect {
    Success,
    Error(String),
    /// Neither `auth=success` nor `error=` was present
    Unrecognized,
}

impl AuthRedirect {
    /// Parse a full redirect URL or a bare query string
    pub fn from_query(input: &str) -> Self {
        let query = match input.split_once('?') {
            Some((_, query)) => query,
            None => input.trim_start_matches('/'),
        };
        // Any base works; only the query pairs are read
        let Ok(url) = Url::parse(&format!("http://localhost/?{}", query)) else {
            return Self::Unrecognized;
        };

        let mut success = false;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "error" => return Self::Error(value.into_owned()),
                "auth" if value == "success" => success = true,
                _ => {}
            }
        }
        if success {
            Self::Success
        } else {
            Self::Unrecognized
        }
    }

    /// Parse the request line of an HTTP request (`GET /?auth=success HTTP/1.1`)
    pub fn from_request_line(line: &str) -> Self {
        line.split_whitespace()
            .nth(1)
            .map_or(Self::Unrecognized, Self::from_query)
    }
}

pub struct RedirectListener {
    listener: TcpListener,
}

impl RedirectListener {
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind login redirect listener on port {}", port))?;
        Ok(Self { listener })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Wait for the redirect, answer the browser, and close the listener
    pub async fn wait(self, timeout: Duration) -> Result<AuthRedirect> {
        let accepted = tokio::time::timeout(timeout, self.listener.accept()).await;
        let (mut stream, peer) = match accepted {
            Ok(result) => result.context("Failed to accept login redirect connection")?,
            Err(_) => bail!("Login timed out. Please try again."),
        };
        tracing::debug!("Login redirect from {}", peer);

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&mut stream);
            reader
                .read_line(&mut request_line)
                .await
                .context("Failed to read login redirect")?;
            // Drain headers so the close doesn't reset the browser's connection
            let mut header = String::new();
            while reader.read_line(&mut header).await.unwrap_or(0) > 0
                && !header.trim().is_empty()
            {
                header.clear();
            }
        }

        let redirect = AuthRedirect::from_request_line(&request_line);
        let body = match &redirect {
            AuthRedirect::Success => "<h1>Gmail connected</h1>\
                 <p>You can close this window and return to flagsort.</p>\
                 <script>window.close();</script>"
                .to_string(),
            AuthRedirect::Error(message) => format!(
                "<h1>Connection failed</h1><p>{}</p>\
                 <p>Please close this window and try again.</p>",
                escape_html(message)
            ),
            AuthRedirect::Unrecognized => {
                "<h1>Unexpected response</h1><p>Return to flagsort and try again.</p>".to_string()
            }
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
             <html><body>{}</body></html>",
            body
        );
        // The browser page is a courtesy; the result stands even if it fails
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            tracing::debug!("Failed to answer login redirect: {}", e);
        }

        Ok(redirect)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[test]
    fn test_parse_success_and_error() {
        assert_eq!(
            AuthRedirect::from_query("http://localhost:8080/?auth=success"),
            AuthRedirect::Success
        );
        assert_eq!(
            AuthRedirect::from_query("error=Access%20denied"),
            AuthRedirect::Error("Access denied".to_string())
        );
        assert_eq!(
            AuthRedirect::from_query("/?auth=success&error=late+failure"),
            AuthRedirect::Error("late failure".to_string())
        );
        assert_eq!(
            AuthRedirect::from_query("http://localhost:8080/"),
            AuthRedirect::Unrecognized
        );
        assert_eq!(
            AuthRedirect::from_query("auth=pending"),
            AuthRedirect::Unrecognized
        );
    }

    #[test]
    fn test_parse_request_line() {
        assert_eq!(
            AuthRedirect::from_request_line("GET /?auth=success HTTP/1.1\r\n"),
            AuthRedirect::Success
        );
        assert_eq!(AuthRedirect::from_request_line(""), AuthRedirect::Unrecognized);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"x\" & 'y'</b>"),
            "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn test_listener_answers_one_redirect() {
        let listener = RedirectListener::bind(0).await.unwrap();
        let port = listener.port().unwrap();
        let waiter = tokio::spawn(listener.wait(Duration::from_secs(5)));

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /?error=Token%20expired HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut page = String::new();
        stream.read_to_string(&mut page).await.unwrap();

        let redirect = waiter.await.unwrap().unwrap();
        assert_eq!(redirect, AuthRedirect::Error("Token expired".to_string()));
        assert!(page.starts_with("HTTP/1.1 200 OK"));
        assert!(page.contains("Token expired"));

        // consumed: nothing listens on the port anymore
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_times_out() {
        let listener = RedirectListener::bind(0).await.unwrap();
        let result = listener.wait(Duration::from_secs(120)).await;
        assert!(result.is_err());
    }
}
