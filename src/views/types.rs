/*!
 * View Types
 * What a sandboxed applet renders first, parsed from its assigned address
 */

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockName, HrlWithContext, RoleName};

/// View of a single applet instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AppletView {
    /// The applet's main surface
    Main,
    /// A named block the applet offers
    Block {
        name: BlockName,
        #[serde(default)]
        context: serde_json::Value,
    },
    /// A resolved locator owned by this applet.
    ///
    /// Only complete once the locator resolved to its owning role and content
    /// classification.
    Attachable {
        role_name: RoleName,
        integrity_zome_name: String,
        entry_type: String,
        hrl_with_context: HrlWithContext,
    },
}

/// View spanning all instances of one applet type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CrossAppletView {
    Main,
    Block {
        name: BlockName,
        #[serde(default)]
        context: serde_json::Value,
    },
}

/// Initial view descriptor of one execution context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "view")]
pub enum RenderView {
    Applet(AppletView),
    CrossApplet(CrossAppletView),
}

impl RenderView {
    /// Whether this context spans applet instances of a whole applet type
    #[must_use]
    pub const fn is_cross_applet(&self) -> bool {
        matches!(self, Self::CrossApplet(_))
    }
}
