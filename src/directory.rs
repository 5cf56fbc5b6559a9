use crate::mac::{self, MacAddress};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Label to hardware address lookup, built at startup and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceDirectory {
    devices: HashMap<String, MacAddress>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("device entry {0:?} is not in NAME=MAC form")]
    BadEntry(String),
    #[error("device {name:?} has an invalid MAC address")]
    BadMac {
        name: String,
        #[source]
        source: mac::ParseError,
    },
    #[error("could not read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a JSON object of device names to MAC addresses", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One `NAME=MAC` entry as given on the command line or in `WOL_DEVICES`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceEntry {
    pub name: String,
    pub mac: MacAddress,
}

impl FromStr for DeviceEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, mac) = s
            .split_once('=')
            .ok_or_else(|| Error::BadEntry(s.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadEntry(s.to_string()));
        }
        let mac = mac.trim().parse::<MacAddress>().map_err(|source| Error::BadMac {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            mac,
        })
    }
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads a JSON object such as `{"desktop": "00:11:22:33:44:55"}`.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|source| Error::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let mut directory = Self::new();
        for (name, mac) in raw {
            let mac = mac.parse::<MacAddress>().map_err(|source| Error::BadMac {
                name: name.clone(),
                source,
            })?;
            directory.insert(name, mac);
        }
        Ok(directory)
    }

    /// Later entries replace earlier ones with the same name.
    pub fn insert(&mut self, name: String, mac: MacAddress) -> Option<MacAddress> {
        self.devices.insert(name, mac)
    }

    pub fn lookup(&self, name: &str) -> Option<MacAddress> {
        self.devices.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Names in sorted order, for logging at startup.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.devices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Extend<DeviceEntry> for DeviceDirectory {
    fn extend<I: IntoIterator<Item = DeviceEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry.name, entry.mac);
        }
    }
}

impl FromIterator<DeviceEntry> for DeviceDirectory {
    fn from_iter<I: IntoIterator<Item = DeviceEntry>>(iter: I) -> Self {
        let mut directory = Self::new();
        directory.extend(iter);
        directory
    }
}

#[cfg(test)]
mod tests {
    use crate::directory::*;
    use std::io::Write;

    #[test]
    fn test_parse_entry() {
        let entry: DeviceEntry = " desktop = 00-11-22-33-44-55 ".parse().unwrap();
        assert_eq!(entry.name, "desktop");
        assert_eq!(
            entry.mac,
            MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
    }

    #[test]
    fn test_parse_entry_errors() {
        assert!(matches!(
            "desktop".parse::<DeviceEntry>(),
            Err(Error::BadEntry(_))
        ));
        assert!(matches!(
            "=00:11:22:33:44:55".parse::<DeviceEntry>(),
            Err(Error::BadEntry(_))
        ));
        assert!(matches!(
            "desktop=00:11:22".parse::<DeviceEntry>(),
            Err(Error::BadMac { .. })
        ));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let entry: DeviceEntry = "desktop=00:11:22:33:44:55".parse().unwrap();
        let directory: DeviceDirectory = vec![entry].into_iter().collect();
        assert!(directory.lookup("desktop").is_some());
        assert!(directory.lookup("Desktop").is_none());
        assert!(directory.lookup("unknown-device").is_none());
    }

    #[test]
    fn test_later_entries_win() {
        let mut directory = DeviceDirectory::new();
        directory.insert("nas".into(), MacAddress::new([1; 6]));
        directory.extend(vec!["nas=02:02:02:02:02:02".parse::<DeviceEntry>().unwrap()]);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.lookup("nas"), Some(MacAddress::new([2; 6])));
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mqttwol-{}-{}", std::process::id(), name));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_from_json_file() {
        let path = write_temp(
            "devices.json",
            r#"{"desktop": "00:11:22:33:44:55", "nas": "aa-bb-cc-dd-ee-ff"}"#,
        );
        let directory = DeviceDirectory::from_json_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(directory.names(), vec!["desktop", "nas"]);
        assert_eq!(
            directory.lookup("nas"),
            Some(MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]))
        );
    }

    #[test]
    fn test_from_json_file_errors() {
        let missing = std::env::temp_dir().join("mqttwol-does-not-exist.json");
        assert!(matches!(
            DeviceDirectory::from_json_file(&missing),
            Err(Error::Read { .. })
        ));

        let path = write_temp("list.json", r#"["00:11:22:33:44:55"]"#);
        let result = DeviceDirectory::from_json_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Json { .. })));

        let path = write_temp("badmac.json", r#"{"desktop": "nope"}"#);
        let result = DeviceDirectory::from_json_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::BadMac { .. })));
    }
}
