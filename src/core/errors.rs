/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity codec and hash parsing errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CodecError {
    #[error("Invalid hash encoding: {0}")]
    #[diagnostic(
        code(codec::invalid_hash),
        help("Hashes travel as base64url without padding. Check the source of the string.")
    )]
    InvalidHash(String),

    #[error("Invalid HRL: {0}")]
    #[diagnostic(
        code(codec::invalid_hrl),
        help("An HRL has the form hrl://<dna-hash>/<entry-hash>.")
    )]
    InvalidHrl(String),

    #[error("Marker character '{0}' is part of the identity alphabet")]
    #[diagnostic(
        code(codec::marker_in_alphabet),
        help(
            "The case-folding codec is only a bijection if the marker never occurs \
             as a literal identifier character. Change the marker or the hash encoding."
        )
    )]
    MarkerInAlphabet(char),
}

/// RPC channel errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ChannelError {
    #[error("Boundary transport closed")]
    #[diagnostic(
        code(channel::closed),
        help("The other side of the isolation boundary went away. The execution context is likely being torn down.")
    )]
    Closed,

    #[error("Remote error: {0}")]
    #[diagnostic(
        code(channel::remote),
        help("The other side rejected the request. The message is propagated verbatim.")
    )]
    Remote(String),

    #[error("Malformed reply payload: {0}")]
    #[diagnostic(
        code(channel::decode),
        help("The reply arrived but did not deserialize into the expected shape.")
    )]
    Decode(String),
}

/// View router errors for malformed addresses and failed attachable resolution
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RouterError {
    #[error("Invalid address: {0}")]
    #[diagnostic(
        code(router::invalid_address),
        help("Applet addresses have the form applet://<encoded-hash>[/..][?query].")
    )]
    InvalidAddress(String),

    #[error("Invalid query string: {0}")]
    #[diagnostic(
        code(router::invalid_query),
        help(
            "The query is positional: view=<single-module|cross-module>&viewType=<main|block|attachable>\
             [&block=<name>|&hrl=<hrl>][&context=<base64>]."
        )
    )]
    InvalidQuery(String),

    #[error("Invalid query string: {0}. Missing block name.")]
    #[diagnostic(code(router::missing_block))]
    MissingBlock(String),

    #[error("Invalid query string: {0}. Missing hrl parameter.")]
    #[diagnostic(code(router::missing_hrl))]
    MissingHrl(String),

    #[error("Invalid context encoding: {0}")]
    #[diagnostic(
        code(router::invalid_context),
        help("The context token carries standard-base64 JSON bytes.")
    )]
    InvalidContext(String),

    #[error("Failed to resolve HRL {hrl}: {message}")]
    #[diagnostic(
        code(router::hrl_resolution),
        help("An attachable view is only complete once its HRL resolves. This is a hard error for this view kind.")
    )]
    HrlResolution { hrl: String, message: String },
}

/// Errors aborting the bootstrap of one execution context.
///
/// Any of these must abort bootstrap; the shell renders a fallback surface
/// instead of a broken applet.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BootstrapError {
    #[error("Applet '{applet_name}' is not installed")]
    #[diagnostic(
        code(bootstrap::not_installed),
        help("Install the applet from the group's home and reload this view.")
    )]
    NotInstalled { applet_name: String },

    #[error("Bad iframe config: {0}")]
    #[diagnostic(
        code(bootstrap::bad_config),
        help("The fetched ExecutionConfig does not match the view arity of this context.")
    )]
    BadConfig(String),

    #[error("Failed to connect applet client: {0}")]
    #[diagnostic(code(bootstrap::client))]
    Client(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),
}

/// Privileged-side handler errors, flattened into reply envelopes at the
/// dispatcher
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HostError {
    #[error("Shell operation failed: {0}")]
    #[diagnostic(code(host::shell))]
    Shell(String),

    #[error("No running host for applet {0}")]
    #[diagnostic(
        code(host::no_applet_host),
        help("The applet's execution context is not running or has not announced readiness yet.")
    )]
    NoAppletHost(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(host::internal))]
    Internal(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),
}
