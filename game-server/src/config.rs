use anyhow::{Context, Result, anyhow};
use game_core::RoomCleanup;
use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub words_file: Option<PathBuf>,
    pub answers_file: Option<PathBuf>,
    pub word_length: usize,
    pub sweep_interval_ms: u64,
    pub cleanup_interval_seconds: u64,
    pub room_idle_timeout_minutes: i64,
    pub finished_room_timeout_minutes: i64,
    pub connection_timeout_seconds: u64,
}

impl Config {
    /// Reads the process environment once. Malformed values are errors, not
    /// silently replaced by defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT", 8080)?,
            words_file: lookup("WORDS_FILE").map(PathBuf::from),
            answers_file: lookup("ANSWERS_FILE").map(PathBuf::from),
            word_length: parse_var(&lookup, "WORD_LENGTH", game_core::DEFAULT_WORD_LENGTH)?,
            sweep_interval_ms: parse_var(&lookup, "SWEEP_INTERVAL_MS", 1000)?,
            cleanup_interval_seconds: parse_var(&lookup, "CLEANUP_INTERVAL_SECONDS", 30)?,
            room_idle_timeout_minutes: parse_var(&lookup, "ROOM_IDLE_TIMEOUT_MINUTES", 120)?,
            finished_room_timeout_minutes: parse_var(
                &lookup,
                "FINISHED_ROOM_TIMEOUT_MINUTES",
                10,
            )?,
            connection_timeout_seconds: parse_var(&lookup, "CONNECTION_TIMEOUT_SECONDS", 300)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("WORD_LENGTH", self.word_length as i64),
            ("SWEEP_INTERVAL_MS", self.sweep_interval_ms as i64),
            ("CLEANUP_INTERVAL_SECONDS", self.cleanup_interval_seconds as i64),
            ("ROOM_IDLE_TIMEOUT_MINUTES", self.room_idle_timeout_minutes),
            (
                "FINISHED_ROOM_TIMEOUT_MINUTES",
                self.finished_room_timeout_minutes,
            ),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if self.answers_file.is_some() && self.words_file.is_none() {
            return Err(anyhow!("ANSWERS_FILE requires WORDS_FILE"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST {:?}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn room_cleanup(&self) -> RoomCleanup {
        RoomCleanup::new(
            chrono::Duration::minutes(self.room_idle_timeout_minutes),
            chrono::Duration::minutes(self.finished_room_timeout_minutes),
        )
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.word_length, 5);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(30));
        assert_eq!(config.connection_timeout(), Duration::from_secs(300));
        assert!(config.words_file.is_none());

        let cleanup = config.room_cleanup();
        assert_eq!(cleanup.idle_threshold, chrono::Duration::hours(2));
        assert_eq!(cleanup.finished_threshold, chrono::Duration::minutes(10));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("WORDS_FILE", "/srv/words.txt"),
            ("ANSWERS_FILE", "/srv/answers.txt"),
            ("SWEEP_INTERVAL_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.words_file, Some(PathBuf::from("/srv/words.txt")));
        assert_eq!(config.sweep_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_malformed_values_fail() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config_from(&[("SWEEP_INTERVAL_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("SWEEP_INTERVAL_MS"));

        assert!(config_from(&[("ANSWERS_FILE", "a.txt")]).is_err());

        let config = config_from(&[("HOST", "not a host")]).unwrap();
        assert!(config.socket_addr().is_err());
    }
}
