//! Type-state IMAP client.
//!
//! The type parameter tracks the protocol state so that, for example,
//! fetching is only possible once a mailbox has been opened:
//! `NotAuthenticated` → (login) → `Authenticated` → (examine) → `Selected`.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::command::{Command, TagGenerator};
use crate::framed::FramedStream;
use crate::parse::{self, FetchRecord, Response, Status};
use crate::{Error, Result};

/// Marker for the state before LOGIN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker for the state after LOGIN, before EXAMINE.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// Marker for the state with a mailbox open read-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selected;

/// Snapshot of the mailbox taken when it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
}

/// IMAP client connection; `State` is one of the marker types above.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Gracefully ends the session with LOGOUT. Valid in every state.
    ///
    /// The server's BYE and tagged completion are read but not required:
    /// some servers drop the connection immediately after BYE.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tags.next();
        self.stream
            .write_command(&Command::Logout.serialize(&tag))
            .await?;
        let _ = self.stream.read_until_tagged(&tag).await;
        debug!("logged out");
        Ok(())
    }

    async fn run(&mut self, command: &Command) -> Result<Vec<Vec<u8>>> {
        let tag = self.tags.next();
        self.stream.write_command(&command.serialize(&tag)).await?;
        let responses = self.stream.read_until_tagged(&tag).await?;
        check_completion(&responses, &tag)?;
        Ok(responses)
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            _state: PhantomData,
        }
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream and consumes the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is unreadable or the server opens
    /// with BYE.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        match parse::parse(&greeting)? {
            Response::ServerStatus {
                status: Status::Ok | Status::PreAuth,
                text,
            } => trace!(greeting = %text, "connected"),
            Response::ServerStatus {
                status: Status::Bye,
                text,
            } => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tags: TagGenerator::new(),
            _state: PhantomData,
        })
    }

    /// Authenticates with LOGIN, consuming self.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`] when the server rejects the credentials.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        self.run(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;
        debug!(username, "authenticated");
        Ok(self.transition())
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a mailbox read-only with EXAMINE, consuming self.
    ///
    /// # Errors
    ///
    /// Returns an error when the mailbox cannot be opened.
    pub async fn examine(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let responses = self
            .run(&Command::Examine {
                mailbox: mailbox.to_string(),
            })
            .await?;

        let mut status = MailboxStatus::default();
        for response in &responses {
            if let Ok(Response::Exists(n)) = parse::parse(response) {
                status.exists = n;
            }
        }

        debug!(mailbox, exists = status.exists, "mailbox opened read-only");
        Ok((self.transition(), status))
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Fetches UID + ENVELOPE summaries for the sequence range `first..=last`.
    ///
    /// Records arrive in server order.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol or server failure.
    pub async fn fetch_summaries(&mut self, first: u32, last: u32) -> Result<Vec<FetchRecord>> {
        let responses = self.run(&Command::FetchSummaries { first, last }).await?;

        let mut records = Vec::new();
        for response in &responses {
            if let Response::Fetch(record) = parse::parse(response)? {
                records.push(*record);
            }
        }
        trace!(count = records.len(), "fetched summaries");
        Ok(records)
    }

    /// Fetches the plain text body section of one message by UID.
    ///
    /// Returns `None` when the server reports no such section.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol or server failure.
    pub async fn uid_fetch_text(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let responses = self.run(&Command::UidFetchText { uid }).await?;

        for response in &responses {
            if let Response::Fetch(record) = parse::parse(response)?
                && record.uid == Some(uid)
            {
                return Ok(record.body);
            }
        }
        Ok(None)
    }
}

/// Checks the tagged completion for `tag` and maps NO/BAD/BYE to errors.
fn check_completion(responses: &[Vec<u8>], tag: &str) -> Result<()> {
    for response in responses.iter().rev() {
        if let Ok(Response::Tagged {
            tag: response_tag,
            status,
            text,
        }) = parse::parse(response)
            && response_tag == tag
        {
            return match status {
                Status::Ok | Status::PreAuth => Ok(()),
                Status::No => Err(Error::No(text)),
                Status::Bad => Err(Error::Bad(text)),
                Status::Bye => Err(Error::Bye(text)),
            };
        }
    }
    Err(Error::Protocol("missing tagged completion".to_string()))
}
