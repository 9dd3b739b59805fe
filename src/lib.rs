pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod image_ref;
pub mod photo;
pub mod queue;
pub mod source;
pub mod supplier;
pub mod webdav;
pub mod tasks {
    pub mod clock;
    pub mod slideshow;
    pub mod viewer;
}
