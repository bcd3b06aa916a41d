//! Email collaborators: IMAP over rustls for the digest, SMTP via lettre
//! for the report.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use mail_parser::{MessageParser, MimeHeaders};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::channels::{MailSink, MailSource};
use crate::error::{ChannelError, ConfigError};

// ── Configuration ───────────────────────────────────────────────────

/// Mail server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Login for both IMAP and SMTP; also the From address of reports.
    pub account: String,
    pub password: SecretString,
    pub mailbox: String,
    /// IMAP search keys prepended to the `SINCE <today>` filter,
    /// e.g. `FROM "no-reply@arxiv.org"`.
    pub search_criterion: String,
}

impl EmailConfig {
    /// Build config from environment variables.
    ///
    /// `EMAIL_ACCOUNT` and `EMAIL_PASSWORD` are required; servers default
    /// to Gmail.
    pub fn from_env() -> Result<Self, ConfigError> {
        let account = std::env::var("EMAIL_ACCOUNT")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_ACCOUNT".into()))?;
        let password = std::env::var("EMAIL_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_PASSWORD".into()))?;

        let imap_host =
            std::env::var("EMAIL_IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string());
        let imap_port = parse_port("EMAIL_IMAP_PORT", 993)?;

        let smtp_host = std::env::var("EMAIL_SMTP_HOST")
            .unwrap_or_else(|_| imap_host.replace("imap", "smtp"));
        let smtp_port = parse_port("EMAIL_SMTP_PORT", 465)?;

        let mailbox = std::env::var("EMAIL_MAILBOX").unwrap_or_else(|_| "INBOX".to_string());
        let search_criterion = std::env::var("SEARCH_CRITERION").unwrap_or_default();

        Ok(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            account,
            password: SecretString::from(password),
            mailbox,
            search_criterion,
        })
    }
}

fn parse_port(key: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a port: {e}"),
        }),
        Err(_) => Ok(default),
    }
}

// ── IMAP source ─────────────────────────────────────────────────────

/// Fetches today's digest from an IMAP mailbox.
pub struct ImapSource {
    config: EmailConfig,
}

impl ImapSource {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailSource for ImapSource {
    fn name(&self) -> &str {
        "imap"
    }

    async fn fetch_digest(&self) -> Result<Option<String>, ChannelError> {
        let cfg = self.config.clone();
        let today = chrono::Local::now().date_naive();

        let result = tokio::task::spawn_blocking(move || fetch_digest_imap(&cfg, today))
            .await
            .map_err(|e| ChannelError::FetchFailed {
                name: "imap".into(),
                reason: format!("IMAP task panicked: {e}"),
            })?;

        result.map_err(|e| match e.downcast::<ChannelError>() {
            Ok(channel_err) => *channel_err,
            Err(other) => ChannelError::FetchFailed {
                name: "imap".into(),
                reason: other.to_string(),
            },
        })
    }
}

// ── SMTP sink ───────────────────────────────────────────────────────

/// Sends reports over SMTP with implicit TLS.
pub struct SmtpSink {
    config: EmailConfig,
}

impl SmtpSink {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailSink for SmtpSink {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        let email = build_message(&self.config.account, recipient, subject, body)?;
        let cfg = self.config.clone();

        tokio::task::spawn_blocking(move || send_smtp(&cfg, &email))
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "smtp".into(),
                reason: format!("SMTP task panicked: {e}"),
            })??;

        info!("Email sent to {recipient}");
        Ok(())
    }
}

/// Build the outgoing report message.
pub fn build_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, ChannelError> {
    Message::builder()
        .from(from.parse().map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("Invalid from address: {e}"),
        })?)
        .to(to.parse().map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("Invalid to address: {e}"),
        })?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("Failed to build email: {e}"),
        })
}

/// Blocking SMTP delivery; run inside `spawn_blocking`.
fn send_smtp(config: &EmailConfig, email: &Message) -> Result<(), ChannelError> {
    let creds = Credentials::new(
        config.account.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("SMTP relay error: {e}"),
        })?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    transport.send(email).map_err(|e| ChannelError::SendFailed {
        name: "smtp".into(),
        reason: format!("SMTP send failed: {e}"),
    })?;
    Ok(())
}

// ── Helpers (public for testing) ────────────────────────────────────

/// IMAP `SEARCH` arguments: the configured criterion plus `SINCE <date>`.
pub fn build_search_query(criterion: &str, since: NaiveDate) -> String {
    let since = format!("SINCE \"{}\"", since.format("%d-%b-%Y"));
    let criterion = criterion.trim();
    if criterion.is_empty() {
        format!("({since})")
    } else {
        format!("({criterion} {since})")
    }
}

/// Quote a string for use as an IMAP quoted-string argument.
pub fn quote_imap(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Message numbers from the untagged `* SEARCH` lines of a response.
pub fn parse_search_response(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.starts_with("* SEARCH"))
        .flat_map(|line| line.split_whitespace().skip(2).map(str::to_string))
        .collect()
}

/// Raw RFC822 bytes from a `FETCH <n> RFC822` response.
///
/// Drops the `* n FETCH (RFC822 {size}` opener, the closing `)` and the
/// tagged completion line.
pub fn fetched_literal(lines: &[String]) -> String {
    let mut body = lines.get(1..lines.len().saturating_sub(1)).unwrap_or_default();
    if body.last().is_some_and(|l| l.trim() == ")") {
        body = &body[..body.len() - 1];
    }
    body.concat()
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    // Normalize whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decoded text body of a raw email: the `text/plain` part, else the
/// tag-stripped HTML part, else a textual attachment.
pub fn extract_text(raw: &[u8]) -> Result<String, ChannelError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ChannelError::InvalidMessage("not an RFC822 message".into()))?;

    if let Some(text) = parsed.body_text(0) {
        return Ok(text.to_string());
    }
    if let Some(html) = parsed.body_html(0) {
        return Ok(strip_html(html.as_ref()));
    }
    for part in parsed.attachments() {
        let part: &mail_parser::MessagePart = part;
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return Ok(text.to_string());
        }
    }
    Err(ChannelError::InvalidMessage(
        "email has no readable text part".into(),
    ))
}

// ── Raw IMAP ────────────────────────────────────────────────────────

/// Error type for IMAP fetch operations.
type ImapError = Box<dyn std::error::Error + Send + Sync>;

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

fn read_line(tls: &mut TlsStream) -> Result<String, ImapError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match std::io::Read::read(tls, &mut byte) {
            Ok(0) => return Err("IMAP connection closed".into()),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn send_cmd(tls: &mut TlsStream, tag: &str, cmd: &str) -> Result<Vec<String>, ImapError> {
    let full = format!("{tag} {cmd}\r\n");
    IoWrite::write_all(tls, full.as_bytes())?;
    IoWrite::flush(tls)?;

    let done_prefix = format!("{tag} ");
    let mut lines = Vec::new();
    loop {
        let line = read_line(tls)?;
        let done = line.starts_with(&done_prefix);
        lines.push(line);
        if done {
            break;
        }
    }
    Ok(lines)
}

fn completed_ok(lines: &[String], tag: &str) -> bool {
    lines
        .last()
        .is_some_and(|l| l.starts_with(&format!("{tag} OK")))
}

/// Fetch the first digest received since `since` (blocking, run in
/// spawn_blocking). `Ok(None)` when the search matched nothing.
fn fetch_digest_imap(config: &EmailConfig, since: NaiveDate) -> Result<Option<String>, ImapError> {
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name = rustls_pki_types::ServerName::try_from(config.imap_host.clone())?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)?;
    let mut tls = rustls::StreamOwned::new(conn, tcp);

    let _greeting = read_line(&mut tls)?;

    let login = send_cmd(
        &mut tls,
        "A1",
        &format!(
            "LOGIN {} {}",
            quote_imap(&config.account),
            quote_imap(config.password.expose_secret())
        ),
    )?;
    if !completed_ok(&login, "A1") {
        return Err(Box::new(ChannelError::AuthFailed {
            name: "imap".into(),
            reason: login.last().map(|l| l.trim().to_string()).unwrap_or_default(),
        }));
    }
    info!(host = %config.imap_host, "Connected to IMAP server");

    let select = send_cmd(&mut tls, "A2", &format!("SELECT {}", quote_imap(&config.mailbox)))?;
    if !completed_ok(&select, "A2") {
        return Err(format!("cannot select mailbox {}", config.mailbox).into());
    }

    let query = build_search_query(&config.search_criterion, since);
    let search = send_cmd(&mut tls, "A3", &format!("SEARCH {query}"))?;
    if !completed_ok(&search, "A3") {
        return Err(format!("IMAP search failed for {query}").into());
    }
    let ids = parse_search_response(&search);
    info!(count = ids.len(), %query, "Found emails matching search");

    let body = match ids.first() {
        Some(id) => {
            debug!(id = %id, "Fetching email");
            let fetch = send_cmd(&mut tls, "A4", &format!("FETCH {id} RFC822"))?;
            if !completed_ok(&fetch, "A4") {
                return Err(format!("failed to fetch email {id}").into());
            }
            Some(extract_text(fetched_literal(&fetch).as_bytes())?)
        }
        None => None,
    };

    let _ = send_cmd(&mut tls, "A5", "LOGOUT");

    Ok(body)
}

// ── Tests ───────────────────────────────────────────────────────────
