//! Tabbed navigation over sites and hosts

mod sites;
mod tabs;

pub use sites::{
    build_host_pane, SiteExplorer, DELETE_HOST_ACTION, RELOAD_CONFIG_ACTION, SITES_CONTENT_PARENT,
    SITES_NAV_PARENT,
};
pub use tabs::{
    build_layout, Activation, NavStyle, PaneContent, TabEntry, TabExplorer, TabLayout, TabLoader,
    TabOptions, TabState,
};
