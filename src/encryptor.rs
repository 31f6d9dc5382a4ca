//! The outbound encryptor: a thin wrapper binding a crypto handler to one
//! object number.

use crate::crypto::CryptoHandler;

/// Encrypts data on behalf of a single object.
pub struct Encryptor<'a> {
    handler: &'a CryptoHandler,
    obj_num: u32,
}

impl<'a> Encryptor<'a> {
    /// Create an encryptor for the object with the given number.
    pub fn new(handler: &'a CryptoHandler, obj_num: u32) -> Self {
        Self { handler, obj_num }
    }

    /// Encrypt `data`. Empty input yields empty output.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        if data.is_empty() {
            return vec![];
        }

        self.handler
            .encrypt_content(self.obj_num, 0, data)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Cipher, CryptoHandler};

    #[test]
    fn empty_in_empty_out() {
        let handler = CryptoHandler::new(Cipher::Rc4, b"0123456789abcdef");
        let encryptor = Encryptor::new(&handler, 12);

        assert!(encryptor.encrypt(b"").is_empty());
        assert!(!encryptor.encrypt(b"x").is_empty());
    }

    #[test]
    fn matches_handler_output() {
        let handler = CryptoHandler::new(Cipher::Rc4, b"0123456789abcdef");
        let encryptor = Encryptor::new(&handler, 12);

        assert_eq!(
            encryptor.encrypt(b"payload"),
            handler.encrypt_content(12, 0, b"payload").unwrap()
        );
    }
}
