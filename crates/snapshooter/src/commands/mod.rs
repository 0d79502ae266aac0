mod check;
mod compare;
mod init;

pub use self::check::check;
pub use self::compare::compare;
pub use self::init::init;
