//! Raw byte to key decoding for the fixed dashboard keybindings.

/// Decoded keyboard input. Only the keys the dashboard binds are named;
/// everything else collapses to [`Key::Char`] (for action lookup) or
/// [`Key::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    PageUp,
    PageDown,
    Escape,
    Interrupt,
    Other,
}

/// Stateful decoder turning raw input chunks into keys.
///
/// Escape sequences and multi-byte characters can be split across reads, so
/// an incomplete trailing sequence is carried over and completed by the next
/// chunk instead of being misread as a lone escape plus stray characters.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

impl KeyDecoder {
    /// Decode one raw chunk, draining every complete key.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Key> {
        self.pending.extend_from_slice(bytes);

        let mut keys = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            match step(&self.pending[index..]) {
                Step::Key(key, consumed) => {
                    keys.push(key);
                    index += consumed;
                }
                Step::Incomplete => break,
            }
        }
        self.pending.drain(..index);

        keys
    }
}

enum Step {
    Key(Key, usize),
    /// The buffer ends mid-sequence; wait for more bytes.
    Incomplete,
}

fn step(bytes: &[u8]) -> Step {
    match bytes[0] {
        0x03 => Step::Key(Key::Interrupt, 1),
        0x1b => decode_escape(bytes),
        _ => decode_char(bytes),
    }
}

fn decode_escape(bytes: &[u8]) -> Step {
    let Some(&second) = bytes.get(1) else {
        return Step::Incomplete;
    };

    match second {
        b'[' | b'O' => {
            let Some(&third) = bytes.get(2) else {
                return Step::Incomplete;
            };
            match third {
                b'A' => Step::Key(Key::Up, 3),
                b'B' => Step::Key(Key::Down, 3),
                b'5' | b'6' => match bytes.get(3) {
                    Some(&b'~') => {
                        let key = if third == b'5' { Key::PageUp } else { Key::PageDown };
                        Step::Key(key, 4)
                    }
                    Some(_) => unknown_sequence(bytes),
                    None => Step::Incomplete,
                },
                _ => unknown_sequence(bytes),
            }
        }
        // ESC followed by a non-sequence byte: the escape key, with the
        // following byte left to decode on its own.
        _ => Step::Key(Key::Escape, 1),
    }
}

/// An unrecognized CSI/SS3 sequence is consumed whole through its final byte
/// (0x40..=0x7e) so parameter bytes are not replayed as characters.
fn unknown_sequence(bytes: &[u8]) -> Step {
    for (offset, &byte) in bytes.iter().enumerate().skip(2) {
        if (0x40..=0x7e).contains(&byte) {
            return Step::Key(Key::Other, offset + 1);
        }
    }
    Step::Incomplete
}

fn decode_char(bytes: &[u8]) -> Step {
    let take = bytes.len().min(4);
    match std::str::from_utf8(&bytes[..take]) {
        Ok(text) => char_key(text),
        Err(error) if error.valid_up_to() > 0 => {
            let text = std::str::from_utf8(&bytes[..error.valid_up_to()]).unwrap_or_default();
            char_key(text)
        }
        // An unexpected end of input is a character split across chunks.
        Err(error) if error.error_len().is_none() => Step::Incomplete,
        Err(_) => Step::Key(Key::Other, 1),
    }
}

fn char_key(text: &str) -> Step {
    let Some(ch) = text.chars().next() else {
        return Step::Key(Key::Other, 1);
    };
    if ch.is_control() {
        Step::Key(Key::Other, ch.len_utf8())
    } else {
        Step::Key(Key::Char(ch), ch.len_utf8())
    }
}

#[cfg(test)]
mod tests {
    use super::{Key, KeyDecoder};

    fn decode(bytes: &[u8]) -> Vec<Key> {
        KeyDecoder::default().feed(bytes)
    }

    #[test]
    fn arrows_decode_from_csi_and_ss3_forms() {
        assert_eq!(decode(b"\x1b[A"), vec![Key::Up]);
        assert_eq!(decode(b"\x1b[B"), vec![Key::Down]);
        assert_eq!(decode(b"\x1bOA"), vec![Key::Up]);
        assert_eq!(decode(b"\x1bOB"), vec![Key::Down]);
    }

    #[test]
    fn page_keys_decode_their_tilde_sequences() {
        assert_eq!(decode(b"\x1b[5~"), vec![Key::PageUp]);
        assert_eq!(decode(b"\x1b[6~"), vec![Key::PageDown]);
    }

    #[test]
    fn quit_keys_decode() {
        assert_eq!(decode(b"q"), vec![Key::Char('q')]);
        assert_eq!(decode(b"\x1bq"), vec![Key::Escape, Key::Char('q')]);
        assert_eq!(decode(b"\x03"), vec![Key::Interrupt]);
    }

    #[test]
    fn plain_characters_pass_through_for_action_lookup() {
        assert_eq!(decode(b"rd"), vec![Key::Char('r'), Key::Char('d')]);
    }

    #[test]
    fn unknown_csi_sequence_collapses_to_one_key() {
        // Right arrow is unbound: consumed whole, not replayed as 'C'.
        assert_eq!(decode(b"\x1b[C"), vec![Key::Other]);
        assert_eq!(decode(b"\x1b[1;5Hq"), vec![Key::Other, Key::Char('q')]);
    }

    #[test]
    fn multiple_keys_in_one_chunk_decode_in_order() {
        assert_eq!(
            decode(b"\x1b[Aq\x1b[6~"),
            vec![Key::Up, Key::Char('q'), Key::PageDown]
        );
    }

    #[test]
    fn utf8_characters_decode_as_single_keys() {
        assert_eq!(decode("é".as_bytes()), vec![Key::Char('é')]);
    }

    #[test]
    fn arrow_sequence_split_after_escape_byte_is_not_an_escape_press() {
        let mut decoder = KeyDecoder::default();
        assert!(decoder.feed(b"\x1b").is_empty());
        assert_eq!(decoder.feed(b"[A"), vec![Key::Up]);
    }

    #[test]
    fn page_sequence_split_mid_parameters_stays_buffered() {
        let mut decoder = KeyDecoder::default();
        assert!(decoder.feed(b"\x1b[").is_empty());
        assert!(decoder.feed(b"5").is_empty());
        assert_eq!(decoder.feed(b"~q"), vec![Key::PageUp, Key::Char('q')]);
    }

    #[test]
    fn unknown_sequence_split_is_not_replayed_as_characters() {
        let mut decoder = KeyDecoder::default();
        assert!(decoder.feed(b"\x1b[1;5").is_empty());
        assert_eq!(decoder.feed(b"Hq"), vec![Key::Other, Key::Char('q')]);
    }

    #[test]
    fn buffered_escape_resolves_when_followed_by_input() {
        let mut decoder = KeyDecoder::default();
        assert!(decoder.feed(b"\x1b").is_empty());
        assert_eq!(decoder.feed(b"\x1b[B"), vec![Key::Escape, Key::Down]);
    }

    #[test]
    fn utf8_character_split_across_chunks_decodes_once() {
        let bytes = "é".as_bytes();
        let mut decoder = KeyDecoder::default();
        assert!(decoder.feed(&bytes[..1]).is_empty());
        assert_eq!(decoder.feed(&bytes[1..]), vec![Key::Char('é')]);
    }
}
