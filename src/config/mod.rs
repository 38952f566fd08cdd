//! Configuration module

mod site;

pub use site::CmsConfig;
pub use site::RevalidateConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::ACCESS_TOKEN_ENV;
