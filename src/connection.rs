use std::sync::Arc;

use crate::error::{Error, Result};

/// Supplies ready, authenticated native handles and takes them back.
/// This is `async_trait`
///
/// Pooling, reconnection and timeouts are the provider's business; the
/// connector acquires at most once per operation and releases every handle
/// it acquired exactly once.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Handle: Send;
    type Error: Into<Error> + Send;

    async fn acquire(&self) -> std::result::Result<Self::Handle, Self::Error>;

    /// Returns a handle, whether the operation using it succeeded or not.
    fn release(&self, handle: Self::Handle);
}

/// Access to the native handle an operation runs against. This is `async_trait`
#[async_trait]
pub trait Lease: Send {
    type Handle: Send;

    /// Handle for the next native call, acquiring it on first use
    async fn handle(&mut self) -> Result<&mut Self::Handle>;
}

/// A caller-owned handle is leased as is.
#[async_trait]
impl<'a, H> Lease for &'a mut H
where
    H: Send,
{
    type Handle = H;

    async fn handle(&mut self) -> Result<&mut H> {
        Ok(&mut **self)
    }
}

/// Handle taken from a [`ConnectionProvider`] for the span of one operation.
///
/// Acquisition is deferred until the handle is first needed and the handle
/// goes back to the provider when the connection is dropped, which covers
/// completion, failure and a consumer that stops early alike.
pub struct Connection<P>
where
    P: ConnectionProvider,
{
    provider: Arc<P>,
    handle: Option<P::Handle>,
}

impl<P> Connection<P>
where
    P: ConnectionProvider,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            handle: None,
        }
    }

    /// Whether a handle is currently held
    pub fn is_acquired(&self) -> bool {
        self.handle.is_some()
    }
}

#[async_trait]
impl<P> Lease for Connection<P>
where
    P: ConnectionProvider,
{
    type Handle = P::Handle;

    async fn handle(&mut self) -> Result<&mut P::Handle> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                debug!("acquiring connection");
                self.provider
                    .acquire()
                    .await
                    .map_err(Into::<Error>::into)?
            }
        };

        Ok(self.handle.insert(handle))
    }
}

impl<P> Drop for Connection<P>
where
    P: ConnectionProvider,
{
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("releasing connection");
            self.provider.release(handle);
        }
    }
}
