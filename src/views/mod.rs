/*!
 * Views Module
 * Typed view descriptors and the address/query view router
 */

pub mod router;
pub mod types;

pub use router::{
    applet_address, applet_hash_from_address, parse_initial_view, query_for_open_view,
    query_of_address,
};
pub use types::{AppletView, CrossAppletView, RenderView};
