//! `embedded_io` adapter over a store session

use embedded_io::{ErrorType, Read, Write};

use crate::io::{Store, StoreError};
use crate::session::Session;

/// Byte-stream view of one session on a store
///
/// Implements `embedded_io::Read` and `embedded_io::Write`, so helpers like
/// `read_exact` and `write_all` work on top of the store's short transfers.
/// `write_all` past capacity fails with `StoreError::NoSpace`; reading past
/// capacity yields EOF (`Ok(0)`).
pub struct SessionStream<'a> {
    store: &'a Store,
    session: &'a mut Session,
}

impl<'a> SessionStream<'a> {
    #[must_use]
    pub fn new(store: &'a Store, session: &'a mut Session) -> Self {
        Self { store, session }
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.session.cursor()
    }
}

impl ErrorType for SessionStream<'_> {
    type Error = StoreError;
}

impl Read for SessionStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.store.read(self.session, buf)
    }
}

impl Write for SessionStream<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.store.write(self.session, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
