/*!
 * Core Types
 * Common types shared across the applet host protocol
 */

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::errors::CodecError;

/// Base64url string form of an applet hash
pub type AppletId = String;

/// Role name an applet cell is installed under
pub type RoleName = String;

/// Name of an attachment type offered by an applet
pub type AttachmentName = String;

/// Name of a render block offered by an applet
pub type BlockName = String;

macro_rules! opaque_hash {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw hash bytes
            #[must_use]
            pub fn from_raw(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            /// Raw hash bytes
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Parse from the base64url string form
            pub fn from_b64(s: &str) -> Result<Self, CodecError> {
                URL_SAFE_NO_PAD
                    .decode(s)
                    .map(Self)
                    .map_err(|e| CodecError::InvalidHash(format!("{s}: {e}")))
            }

            /// Base64url string form
            #[must_use]
            pub fn to_b64(&self) -> String {
                URL_SAFE_NO_PAD.encode(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_b64())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_b64())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_b64())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_b64(&s).map_err(D::Error::custom)
            }
        }
    };
}

opaque_hash! {
    /// Content hash identifying one installed applet instance.
    ///
    /// Assigned once when the applet's execution context is created and never
    /// reassigned for the lifetime of that context. The sandboxed side derives
    /// it only from its own assigned address.
    AppletHash
}

opaque_hash! {
    /// Hash of the app-store entry a family of applet instances descends from.
    ///
    /// Cross-applet views address this rather than a single installed instance.
    AppletBundleId
}

opaque_hash! {
    /// Network identity half of an HRL
    DnaHash
}

opaque_hash! {
    /// Content identity half of an HRL
    EntryHash
}

/// HRL: a two-part locator referencing content owned by some applet.
///
/// Both halves are mandatory; an unresolvable HRL is represented by an explicit
/// not-found value at the resolver, never by partially populated fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hrl {
    pub dna_hash: DnaHash,
    pub entry_hash: EntryHash,
}

impl Hrl {
    #[must_use]
    pub fn new(dna_hash: DnaHash, entry_hash: EntryHash) -> Self {
        Self {
            dna_hash,
            entry_hash,
        }
    }

    /// Parse the `hrl://<dna>/<entry>` URI form
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let rest = s
            .strip_prefix("hrl://")
            .ok_or_else(|| CodecError::InvalidHrl(s.to_string()))?;
        let (dna, entry) = rest
            .split_once('/')
            .ok_or_else(|| CodecError::InvalidHrl(s.to_string()))?;
        Ok(Self {
            dna_hash: DnaHash::from_b64(dna)?,
            entry_hash: EntryHash::from_b64(entry)?,
        })
    }
}

impl fmt::Display for Hrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hrl://{}/{}", self.dna_hash, self.entry_hash)
    }
}

/// HRL with an attached opaque context blob.
///
/// The context is owned entirely by application code; the protocol carries it
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrlWithContext {
    pub hrl: Hrl,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl HrlWithContext {
    #[must_use]
    pub fn new(hrl: Hrl) -> Self {
        Self {
            hrl,
            context: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Resolved location of an HRL: owning role and content classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrlLocation {
    pub role_name: RoleName,
    pub integrity_zome_name: String,
    pub entry_type: String,
}

/// Wire form of an attachment type: the `create` capability is stripped and
/// re-attached as a remote-invocation stub on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentTypeDescriptor {
    pub label: String,
    pub icon_src: String,
}

/// Descriptive info about an installed applet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppletInfo {
    pub applet_name: String,
    /// Groups this applet instance is shared with
    pub group_ids: Vec<DnaHash>,
}

/// Profile of a group an applet runs inside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub name: String,
    pub logo_src: String,
}

/// Info an applet reports about one of its attachables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachableInfo {
    pub name: String,
    pub icon_src: String,
}

/// Attachable info together with the applet that owns the attachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachableLocationAndInfo {
    pub applet_hash: AppletHash,
    pub attachable_info: AttachableInfo,
}

/// A render block an applet offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockType {
    pub label: String,
    pub icon_src: String,
}

/// Urgency level of an applet notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationUrgency {
    Low,
    Medium,
    High,
}

/// Notification dispatched by an applet towards the shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub urgency: NotificationUrgency,
    /// Milliseconds since epoch
    pub timestamp: u64,
}

/// Where an HRL should be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenHrlMode {
    Front,
    Side,
}
