//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web as __actix_web;

/// Generate a `pub fn routes(cfg: &mut ServiceConfig)` for the current module.
///
/// `route <handler>` registers an actix handler declared with one of the
/// routing attributes (`#[get]`, `#[post]`, ...). `module <name>` delegates
/// to the `routes` function of a child module.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     module endpoints,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    (@one $cfg:ident route $handler:ident) => {
        $cfg.service($handler);
    };
    (@one $cfg:ident module $module:ident) => {
        $cfg.configure($module::routes);
    };
    ($($kind:ident $item:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__actix_web::web::ServiceConfig) {
            $($crate::routes!(@one cfg $kind $item);)*
        }
    };
}
