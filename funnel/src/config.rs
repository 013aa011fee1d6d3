use std::fs::File;
use std::io::prelude::*;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use crate::error::Error;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: SocketAddr,
    /// Upper bound on concurrently open rooms; unlimited when absent.
    #[serde(default)]
    pub max_rooms: Option<usize>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let mut file = File::open(&path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        contents.parse()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(contents: &str) -> Result<Config, Error> {
        Ok(toml::from_str(contents)?)
    }
}
