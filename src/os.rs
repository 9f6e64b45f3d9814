//! Multi-page application host
//!
//! Pages are named, ordered groups of applications. One page is active at a
//! time and receives wire events; applications on it send feedback through
//! the host's [`DeviceOutput`].

mod output;
mod page;

pub use page::Page;

use crate::app::Application;
use crate::output::DeviceOutput;
use serde::{Deserialize, Serialize};

/// Host behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OsOptions {
    /// Deactivate the previous page's applications on `switch_page`
    pub deactivate_previous_on_switch: bool,
}

/// Hosts pages of applications and owns the device output
pub struct MidasOs {
    pages: Vec<Page>,
    active_page: Option<String>,
    options: OsOptions,
    output: Box<dyn DeviceOutput>,
}

impl MidasOs {
    pub fn new(output: Box<dyn DeviceOutput>) -> Self {
        Self::with_options(output, OsOptions::default())
    }

    pub fn with_options(output: Box<dyn DeviceOutput>, options: OsOptions) -> Self {
        Self {
            pages: Vec::new(),
            active_page: None,
            options,
            output,
        }
    }

    pub fn options(&self) -> OsOptions {
        self.options
    }

    pub fn set_options(&mut self, options: OsOptions) {
        self.options = options;
    }

    pub fn active_page(&self) -> Option<&str> {
        self.active_page.as_deref()
    }

    /// Page names in creation order
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.name())
    }

    /// Number of applications on `page`, if it exists
    pub fn page_len(&self, page: &str) -> Option<usize> {
        self.page(page).map(Page::len)
    }

    pub fn application(&self, page: &str, index: usize) -> Option<&dyn Application> {
        self.page(page)?.get(index)
    }

    pub fn application_mut(&mut self, page: &str, index: usize) -> Option<&mut (dyn Application + 'static)> {
        self.page_mut(page)?.get_mut(index)
    }

    fn page(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.name() == name)
    }

    fn page_mut(&mut self, name: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.name() == name)
    }
}
