use serde::Deserialize;

/// Behaviour switches of a [`Mux`](crate::route::Mux).
///
/// Every field is optional when deserializing and falls back to the value
/// of [`MuxConfig::default`].
///
/// # Example
///
/// ```
/// use radix_mux::route::MuxConfig;
///
/// let config: MuxConfig = serde_json::from_str(r#"{"redirect_fixed_path": false}"#).unwrap();
/// assert!(!config.redirect_fixed_path);
/// assert!(config.redirect_trailing_slash);
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Redirect when only the path with its trailing slash added or removed
    /// has a route. `GET` requests get `301`, everything else `308`.
    pub redirect_trailing_slash: bool,

    /// Redirect to the cleaned and case-corrected path when one is
    /// registered.
    pub redirect_fixed_path: bool,

    /// Answer `405 METHOD NOT ALLOWED` with an `Allow` header when the path
    /// is registered for other methods.
    pub handle_method_not_allowed: bool,

    /// Answer `OPTIONS` requests automatically.
    pub handle_options: bool,

    /// Registering a pattern twice replaces its handler instead of failing,
    /// and [`Mux::replace`](crate::route::Mux::replace) is enabled.
    pub mutable: bool,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            mutable: false,
        }
    }
}
