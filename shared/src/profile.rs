use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Profile or resolution specification that does not follow the grammar.
/// Profiles come from deployment configuration, so this is fatal at startup
/// and never a per-request condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid resolution: {0}")]
    Resolution(String),

    #[error("invalid profile: {0}")]
    Profile(String),
}

/// Media encoding profile, an ensemble of resolutions (e.g. an avatar profile
/// defines small, medium and large encodings of the user's avatar).
///
/// The textual form is `selector|resolution[:resolution...][|sink]`, where the
/// selector is a key prefix, optionally split by `@` into `prefix@suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub prefix: String,
    pub suffix: String,
    pub resolutions: Vec<Resolution>,
    pub sink: Option<String>,
}

impl Profile {
    /// Selects inbound objects by key prefix.
    pub fn on(prefix: impl Into<String>) -> Profile {
        Profile {
            prefix: prefix.into(),
            ..Profile::default()
        }
    }

    /// Selects inbound objects by key suffix.
    pub fn of(suffix: impl Into<String>) -> Profile {
        Profile {
            suffix: suffix.into(),
            ..Profile::default()
        }
    }

    /// Defines the processing steps executed for each matching media file.
    pub fn process(mut self, seq: impl IntoIterator<Item = Resolution>) -> Profile {
        self.resolutions = seq.into_iter().collect();
        self
    }

    /// Announces completion of each processed media file to the given bus.
    pub fn sink_to(mut self, sink: impl Into<String>) -> Profile {
        self.sink = Some(sink.into());
        self
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(spec: &str) -> Result<Profile, ProfileError> {
        let mut seq = spec.split('|');

        let selector = seq.next().unwrap_or_default();
        let resolutions = match seq.next() {
            Some(resolutions) => resolutions,
            None => return Err(ProfileError::Profile(spec.to_string())),
        };
        let sink = seq.next().map(str::to_string);

        if selector.is_empty() || seq.next().is_some() || sink.as_deref() == Some("") {
            return Err(ProfileError::Profile(spec.to_string()));
        }

        let (prefix, suffix) = match selector.split_once('@') {
            Some((prefix, suffix)) => (prefix.to_string(), suffix.to_string()),
            None => (selector.to_string(), String::new()),
        };

        let resolutions = resolutions
            .split(':')
            .map(Resolution::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Profile {
            prefix,
            suffix,
            resolutions,
            sink,
        })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix)?;
        if !self.suffix.is_empty() {
            write!(f, "@{}", self.suffix)?;
        }

        let seq: Vec<String> = self.resolutions.iter().map(Resolution::to_string).collect();
        write!(f, "|{}", seq.join(":"))?;

        if let Some(sink) = &self.sink {
            write!(f, "|{sink}")?;
        }

        Ok(())
    }
}

/// One named output variant: an exact target resolution, or a replica that is
/// re-encoded without resizing (width and height both zero).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Processing step that scales media to the given resolution.
    pub fn scale_to(label: impl Into<String>, width: u32, height: u32) -> Resolution {
        Resolution {
            label: label.into(),
            width,
            height,
        }
    }

    /// Processing step that copies media "almost" as-is: re-encoded and
    /// relabeled, never resized.
    pub fn replica(label: impl Into<String>) -> Resolution {
        Resolution {
            label: label.into(),
            width: 0,
            height: 0,
        }
    }

    pub fn is_replica(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl FromStr for Resolution {
    type Err = ProfileError;

    fn from_str(spec: &str) -> Result<Resolution, ProfileError> {
        if spec.is_empty() {
            return Err(ProfileError::Resolution(spec.to_string()));
        }

        let (label, dimensions) = match spec.split_once('-') {
            None => return Ok(Resolution::replica(spec)),
            Some(seq) => seq,
        };

        let err = || ProfileError::Resolution(spec.to_string());

        if label.is_empty() || dimensions.contains('-') {
            return Err(err());
        }

        let (width, height) = dimensions.split_once('x').ok_or_else(err)?;
        let width: u32 = width.parse().map_err(|_| err())?;
        let height: u32 = height.parse().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(err());
        }

        Ok(Resolution::scale_to(label, width, height))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_replica() {
            return write!(f, "{}", self.label);
        }

        write!(f, "{}-{}x{}", self.label, self.width, self.height)
    }
}
