use std::fmt;
use std::str::FromStr;

const OCTETS: usize = 6;
// "AA:BB:CC:DD:EE:FF"
const TEXT_LEN: usize = OCTETS * 3 - 1;

/// A 6-byte hardware address, displayed as upper-case colon-separated hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; OCTETS]);

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("expected 17 characters, got {0}")]
    WrongLength(usize),
    #[error("octets must be separated by ':' or '-'")]
    BadSeparator,
    #[error("octet {0:?} is not hex")]
    BadOctet(String),
}

impl MacAddress {
    pub const fn new(bytes: [u8; OCTETS]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; OCTETS] {
        self.0
    }
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TEXT_LEN {
            return Err(ParseError::WrongLength(s.len()));
        }
        let bytes = s.as_bytes();
        let mut mac = [0u8; OCTETS];
        for (i, octet) in mac.iter_mut().enumerate() {
            let start = i * 3;
            if i > 0 && !matches!(bytes[start - 1], b':' | b'-') {
                return Err(ParseError::BadSeparator);
            }
            let digits = &bytes[start..start + 2];
            match (hex_value(digits[0]), hex_value(digits[1])) {
                (Some(hi), Some(lo)) => *octet = hi << 4 | lo,
                _ => {
                    return Err(ParseError::BadOctet(
                        String::from_utf8_lossy(digits).into_owned(),
                    ))
                }
            }
        }
        Ok(Self(mac))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl From<[u8; OCTETS]> for MacAddress {
    fn from(bytes: [u8; OCTETS]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::mac::*;

    macro_rules! test_parse {
        ($name:ident, $s:expr, $o:expr) => {
            #[test]
            fn $name() {
                let parsed: Result<MacAddress, ParseError> = $s.parse();
                assert_eq!(parsed, $o);
            }
        };
    }

    const AABB: MacAddress = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

    test_parse! {colons, "AA:BB:CC:DD:EE:FF", Ok(AABB)}
    test_parse! {hyphens, "AA-BB-CC-DD-EE-FF", Ok(AABB)}
    test_parse! {lower_case, "aa:bb:cc:dd:ee:ff", Ok(AABB)}
    test_parse! {mixed_case, "aA:Bb:cC:dD:Ee:fF", Ok(AABB)}
    test_parse! {mixed_separators, "AA:BB-CC:DD-EE:FF", Ok(AABB)}
    test_parse! {too_short, "AA:BB:CC:DD:EE", Err(ParseError::WrongLength(14))}
    test_parse! {too_long, "AA:BB:CC:DD:EE:FF:00", Err(ParseError::WrongLength(20))}
    test_parse! {no_separators, "AABBCCDDEEFF", Err(ParseError::WrongLength(12))}
    test_parse! {dots, "AA.BB.CC.DD.EE.FF", Err(ParseError::BadSeparator)}
    test_parse! {non_hex, "AA:BB:CC:DD:EE:GG", Err(ParseError::BadOctet("GG".to_string()))}
    test_parse! {plus_sign, "AA:BB:CC:DD:EE:+F", Err(ParseError::BadOctet("+F".to_string()))}
    test_parse! {label, "living-room-pc", Err(ParseError::WrongLength(14))}

    #[test]
    fn test_display_normalizes() {
        let mac: MacAddress = "0a-1b-2c-3d-4e-5f".parse().unwrap();
        assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
    }

    #[test]
    fn test_multibyte_input_is_rejected() {
        // 17 bytes, but the octet boundaries fall inside a UTF-8 sequence.
        let s = "AA:BB:CC:DD:EE:é";
        assert_eq!(s.len(), 17);
        assert!(s.parse::<MacAddress>().is_err());
    }
}
