//! Runtime settings, filled from the command line.

use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use crate::{
    audio::schedule::{Scheduler, DEFAULT_FREQUENCY},
    coding::{DecodePolicy, Transcoder},
    error::Result,
    timing::TimingProfile,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// Words per minute
    Wpm(f64),
    /// Length of a dot in milliseconds
    Unit(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub speed: Speed,
    pub frequency: f32,
    pub policy: DecodePolicy,
    /// Output device name, `default` for the host default
    pub device: String,
    /// Output gain applied after mixing, 0 to 1
    pub gain: f32,
}

impl Settings {
    /// Reads the global options defined by the binary's argument parser.
    pub fn from_args(args: &ArgMatches) -> Self {
        let speed = match args.get_one::<f64>("unit") {
            Some(unit) => Speed::Unit(*unit),
            None => Speed::Wpm(args.get_one::<f64>("wpm").copied().unwrap_or(20.0)),
        };

        let policy = match args.get_flag("strict") {
            true => DecodePolicy::Strict,
            false => DecodePolicy::Lenient,
        };

        Self {
            speed,
            frequency: args
                .get_one::<f32>("frequency")
                .copied()
                .unwrap_or(DEFAULT_FREQUENCY),
            policy,
            device: args
                .get_one::<String>("device")
                .cloned()
                .unwrap_or_else(|| "default".to_owned()),
            gain: args.get_one::<f32>("gain").copied().unwrap_or(0.5),
        }
    }

    pub fn timing(&self) -> Result<TimingProfile> {
        match self.speed {
            Speed::Wpm(wpm) => TimingProfile::from_wpm(wpm),
            Speed::Unit(unit) => TimingProfile::from_unit(unit),
        }
    }

    pub fn scheduler(&self) -> Result<Scheduler> {
        Ok(Scheduler::new(self.timing()?).frequency(self.frequency))
    }

    pub fn transcoder(&self) -> Transcoder<'static> {
        Transcoder::new(self.policy)
    }
}

#[cfg(test)]
mod test {
    use super::{Settings, Speed};
    use crate::{coding::DecodePolicy, error::Error};

    fn settings(speed: Speed) -> Settings {
        Settings {
            speed,
            frequency: 700.0,
            policy: DecodePolicy::Strict,
            device: "default".to_owned(),
            gain: 0.5,
        }
    }

    #[test]
    fn test_settings_timing() {
        assert_eq!(
            settings(Speed::Wpm(12.0)).timing().unwrap().unit_ms(),
            100.0
        );
        assert_eq!(
            settings(Speed::Unit(75.0)).timing().unwrap().unit_ms(),
            75.0
        );
        assert!(matches!(
            settings(Speed::Wpm(0.0)).timing(),
            Err(Error::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_settings_serde() {
        let json = serde_json::to_string(&settings(Speed::Wpm(25.0))).unwrap();
        assert!(json.contains("\"wpm\":25.0"));
        assert!(json.contains("\"policy\":\"strict\""));

        let back = serde_json::from_str::<Settings>(&json).unwrap();
        assert_eq!(back, settings(Speed::Wpm(25.0)));
    }

    #[test]
    fn test_settings_scheduler() {
        let line = settings(Speed::Unit(10.0)).transcoder().encode("E");
        let schedule = settings(Speed::Unit(10.0))
            .scheduler()
            .unwrap()
            .build(&line)
            .unwrap();
        assert_eq!(schedule.events()[0].frequency_hz, 700.0);
        assert_eq!(schedule.events()[0].duration_ms, 10.0);
    }
}
