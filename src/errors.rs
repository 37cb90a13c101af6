use failure::Fail;

use crate::ecs::Entity;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    IO(::std::io::Error),
    #[fail(display = "{}", _0)]
    Json(::serde_json::Error),
    #[fail(display = "{} already has a component of type {}.", _0, _1)]
    DuplicatedComponent(Entity, &'static str),
    #[fail(display = "{} has no component of type {}.", _0, _1)]
    ComponentNotFound(Entity, &'static str),
    #[fail(display = "Component type {} is not registered.", _0)]
    ComponentNotRegistered(&'static str),
    #[fail(display = "Component type {} has been registered already.", _0)]
    DuplicatedRegistration(&'static str),
    #[fail(display = "Components can not be attached to the invalid entity.")]
    InvalidEntity,
    #[fail(display = "Entity allocator has not been seeded.")]
    AllocatorNotSeeded,
    #[fail(display = "Entity id space has been exhausted.")]
    EntityExhausted,
    #[fail(display = "Can not dispatch {} jobs in one go.", _0)]
    TooManyJobs(usize),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<::serde_json::Error> for Error {
    fn from(err: ::serde_json::Error) -> Self {
        Error::Json(err)
    }
}
