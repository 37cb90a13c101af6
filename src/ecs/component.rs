//! Abstract `Component` trait.

use std::any::Any;

/// A plain data record which could be attached to entities. Every component
/// type lives in its own `ComponentStore` inside the `World`.
pub trait Component: Any + Send + Sync + 'static {
    /// Human readable name used in error messages and logs.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        ::std::any::type_name::<Self>()
    }
}

/// Declare a struct as component. Internally, this macro will impl a internal
/// trait `Component` so the type could be registered into the `World`.
#[macro_export]
macro_rules! declare_component {
    ( $CMP:ident ) => {
        impl $crate::ecs::Component for $CMP {}
    };
}
