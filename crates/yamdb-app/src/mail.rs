//! Outgoing mail, used to deliver confirmation codes.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt as _};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Mail date format error: {0}")]
    DateFormat(#[from] time::error::Format),
}

pub type Result<T, E = MailError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn confirmation_code(from: &str, to: &str, username: &str, code: &str) -> Self {
        Message {
            from: from.to_string(),
            to: to.to_string(),
            subject: "YaMDb confirmation code".to_string(),
            body: format!(
                "Hello {username},\r\n\r\nyour confirmation code is: {code}\r\n\r\n\
                Exchange it for an access token at /api/v1/auth/token/.\r\n"
            ),
        }
    }

    /// RFC 5322 text of the message.
    pub fn to_eml(&self, id: &str) -> Result<String> {
        let date = OffsetDateTime::now_utc().format(&Rfc2822)?;
        Ok(format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {date}\r\nMessage-ID: <{id}@yamdb>\r\n\
            MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.from, self.to, self.subject, self.body
        ))
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: Message) -> BoxFuture<'_, Result<()>>;
}

/// Stores each message as `.eml` file in a directory.
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    async fn write(&self, message: Message) -> Result<()> {
        if !fs::try_exists(&self.dir).await? {
            fs::create_dir_all(&self.dir).await?;
        }
        let id = uuid::Uuid::new_v4().to_string();
        let content = message.to_eml(&id)?;
        // written under temporary name first, so readers never see partial message
        let tmp_path = self.dir.join(format!(".{id}.tmp"));
        let final_path = self.dir.join(format!("{id}.eml"));
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&tmp_path, &final_path).await?;
        debug!("Mail to {} stored in {:?}", message.to, final_path);
        Ok(())
    }
}

impl Mailer for FileMailer {
    fn send(&self, message: Message) -> BoxFuture<'_, Result<()>> {
        self.write(message).boxed()
    }
}

/// Only logs messages.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: Message) -> BoxFuture<'_, Result<()>> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body.replace("\r\n", " ").replace('\n', " "),
            "Mail not delivered, no mail directory configured"
        );
        futures::future::ready(Ok(())).boxed()
    }
}
