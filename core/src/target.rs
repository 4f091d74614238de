//! Optional typed output slots for `Requester::execute`.
//!
//! The caller picks "absent" or "present" through the static type it passes:
//! `()` declines decoding, `&mut T` always decodes, and `Option<&mut T>`
//! decides at the call site.

use serde::de::DeserializeOwned;

pub trait Target {
    /// Whether a body would be decoded into this slot.
    fn is_present(&self) -> bool;

    /// Decode `body` into the slot. Absent slots leave the body untouched.
    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error>;
}

impl Target for () {
    fn is_present(&self) -> bool {
        false
    }

    fn decode(&mut self, _body: &[u8]) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl<T: DeserializeOwned> Target for &mut T {
    fn is_present(&self) -> bool {
        true
    }

    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        **self = serde_json::from_slice(body)?;
        Ok(())
    }
}

impl<T: DeserializeOwned> Target for Option<&mut T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        match self {
            Some(slot) => slot.decode(body),
            None => Ok(()),
        }
    }
}
