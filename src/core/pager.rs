//! Device account pagination
//!
//! Read-only browsing cursor over the device's account space. The pager only
//! tracks the current page and computes index windows; address derivation is
//! done by the keyring against the cached public key, so paging never costs a
//! bridge round trip and never touches the registry.

use ethers::types::U256;
use serde::Serialize;

/// Accounts shown per page.
pub const PER_PAGE: usize = 5;

/// Paging direction requested by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    First,
    Next,
    Previous,
}

/// A candidate device account presented for selection. Not yet unlocked; the
/// balance is unknown until the host looks it up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageAccount {
    pub address: String,
    pub balance: Option<U256>,
    pub index: u32,
}

/// Page cursor. Starts unset (page 0) and only reaches page 1 once a page is
/// explicitly requested.
#[derive(Debug, Clone)]
pub struct AccountPager {
    page: usize,
    per_page: usize,
}

impl Default for AccountPager {
    fn default() -> Self {
        Self { page: 0, per_page: PER_PAGE }
    }
}

impl AccountPager {
    /// Move the cursor and return the resulting page number (always >= 1).
    pub fn advance(&mut self, direction: PageDirection) -> usize {
        self.page = match direction {
            PageDirection::First => 1,
            PageDirection::Next => self.page + 1,
            PageDirection::Previous => self.page.saturating_sub(1).max(1),
        };
        self.page
    }

    /// Device account indices covered by the current page.
    pub fn window(&self) -> std::ops::Range<u32> {
        let from = (self.page.max(1) - 1) * self.per_page;
        (from as u32)..((from + self.per_page) as u32)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }
}
