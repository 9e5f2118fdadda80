//! Proxies for org.gnome.NautilusPreviewer

use zbus::proxy;

/// Proxy for the previewer's primary interface
#[proxy(
    interface = "org.gnome.NautilusPreviewer",
    default_service = "org.gnome.NautilusPreviewer",
    default_path = "/org/gnome/NautilusPreviewer"
)]
pub trait Previewer {
    /// Show `uri` in a preview window transient for the X window `window_id`
    fn show_file(
        &self,
        uri: &str,
        window_id: i32,
        close_if_already_visible: bool,
    ) -> zbus::Result<()>;

    /// Hide the preview window
    #[zbus(no_autostart)]
    fn close(&self) -> zbus::Result<()>;
}

/// Proxy for the interface carrying selection navigation events
#[proxy(
    interface = "org.gnome.NautilusPreviewer2",
    default_service = "org.gnome.NautilusPreviewer",
    default_path = "/org/gnome/NautilusPreviewer"
)]
pub trait PreviewerEvents {
    /// Keyboard navigation inside the previewer, as a focus direction code
    #[zbus(signal)]
    fn selection_event(&self, direction: u32) -> zbus::Result<()>;
}
