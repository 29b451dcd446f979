/// Router Module Index
///
/// Splits the routing table by access level. The authenticated router is wrapped in the
/// session middleware as a whole, so a route cannot be exposed anonymously by accident.

/// Routes open to everyone: catalog reads, profiles, signup and the login flow.
pub mod public;

/// Routes that require a signed-in user. Ownership rules are applied per handler
/// through the `policy` module.
pub mod authenticated;
