use ratatui::widgets::ListState;

use crate::assistant::{AssistantGateway, GatewayError};
use crate::catalog::{Catalog, Product, CATEGORIES};
use crate::chat::{Conversation, CONNECTION_FALLBACK};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Search,
    ProductDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub const ALL_CATEGORY: &str = "All";

/// The product set a view shows, as a pure function of the view state.
///
/// Search with a non-empty query matches title, category, or brand
/// case-insensitively; otherwise the active category filters the catalog,
/// with "All" passing everything through.
pub fn visible_products<'a>(
    products: &'a [Product],
    view: View,
    query: &str,
    category: &str,
) -> Vec<&'a Product> {
    if view == View::Search && !query.trim().is_empty() {
        let needle = query.to_lowercase();
        products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
                    || p.brand.to_lowercase().contains(&needle)
            })
            .collect()
    } else if category != ALL_CATEGORY {
        products.iter().filter(|p| p.category == category).collect()
    } else {
        products.iter().collect()
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub view: View,
    pub input_mode: InputMode,

    // Catalog browsing state
    pub catalog: Catalog,
    pub search_input: String,
    pub search_cursor: usize,
    pub active_category: String,
    pub product_state: ListState,
    pub selected_product_id: Option<String>,
    pub detail_scroll: u16,

    // Chat panel state
    pub show_chat: bool,
    pub conversation: Conversation,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub ask_task: Option<tokio::task::JoinHandle<Result<String, GatewayError>>>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // AI backend
    pub gateway: AssistantGateway,
}

impl App {
    pub fn new() -> anyhow::Result<Self> {
        let catalog = Catalog::load_builtin()?;

        let config = Config::load().unwrap_or_default();
        let gateway = AssistantGateway::new(config.resolve_api_key(), &config);

        let mut product_state = ListState::default();
        product_state.select(Some(0));

        Ok(Self {
            should_quit: false,
            view: View::Home,
            input_mode: InputMode::Normal,

            catalog,
            search_input: String::new(),
            search_cursor: 0,
            active_category: ALL_CATEGORY.to_string(),
            product_state,
            selected_product_id: None,
            detail_scroll: 0,

            show_chat: false,
            conversation: Conversation::new(),
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            ask_task: None,
            animation_frame: 0,

            gateway,
        })
    }

    /// All category tabs, "All" first.
    pub fn category_row(&self) -> Vec<&'static str> {
        let mut row = vec![ALL_CATEGORY];
        row.extend(CATEGORIES.iter().copied());
        row
    }

    pub fn visible(&self) -> Vec<&Product> {
        visible_products(
            self.catalog.products(),
            self.view,
            &self.search_input,
            &self.active_category,
        )
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.selected_product_id
            .as_deref()
            .and_then(|id| self.catalog.get(id))
    }

    /// The product under the list cursor in the current view.
    pub fn highlighted_product(&self) -> Option<&Product> {
        let visible = self.visible();
        self.product_state
            .selected()
            .and_then(|i| visible.get(i).copied())
    }

    // List navigation over the visible product set
    pub fn product_nav_down(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            let i = self.product_state.selected().unwrap_or(0);
            self.product_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn product_nav_up(&mut self) {
        let i = self.product_state.selected().unwrap_or(0);
        self.product_state.select(Some(i.saturating_sub(1)));
    }

    pub fn next_category(&mut self) {
        let row = self.category_row();
        let i = row.iter().position(|c| *c == self.active_category).unwrap_or(0);
        self.active_category = row[(i + 1) % row.len()].to_string();
        self.product_state.select(Some(0));
    }

    pub fn prev_category(&mut self) {
        let row = self.category_row();
        let i = row.iter().position(|c| *c == self.active_category).unwrap_or(0);
        self.active_category = row[(i + row.len() - 1) % row.len()].to_string();
        self.product_state.select(Some(0));
    }

    // View transitions
    pub fn perform_search(&mut self) {
        if self.search_input.trim().is_empty() {
            return;
        }
        self.view = View::Search;
        self.selected_product_id = None;
        self.product_state.select(Some(0));
    }

    pub fn open_highlighted_product(&mut self) {
        let id = self.highlighted_product().map(|p| p.id.clone());
        if let Some(id) = id {
            self.selected_product_id = Some(id);
            self.view = View::ProductDetail;
            self.detail_scroll = 0;
        }
    }

    pub fn leave_product_detail(&mut self) {
        self.selected_product_id = None;
        self.view = if self.search_input.trim().is_empty() {
            View::Home
        } else {
            View::Search
        };
    }

    pub fn go_home(&mut self) {
        self.view = View::Home;
        self.search_input.clear();
        self.search_cursor = 0;
        self.selected_product_id = None;
        self.active_category = ALL_CATEGORY.to_string();
        self.product_state.select(Some(0));
    }

    // Chat panel
    pub fn open_chat(&mut self) {
        self.show_chat = true;
        let product = self.selected_product().cloned();
        self.conversation.open(product.as_ref());
        self.scroll_chat_to_bottom();
    }

    pub fn close_chat(&mut self) {
        self.show_chat = false;
    }

    /// Accepts the chat input and spawns the single in-flight gateway call.
    /// Rejected submissions (blank input, request already pending) leave
    /// everything untouched.
    pub fn begin_ask(&mut self) {
        if self.ask_task.is_some() {
            return;
        }
        let Some(query) = self.conversation.begin_submit(&self.chat_input) else {
            return;
        };

        self.chat_input.clear();
        self.chat_cursor = 0;
        self.scroll_chat_to_bottom();

        let gateway = self.gateway.clone();
        let product = self.selected_product().cloned();
        self.ask_task = Some(tokio::spawn(async move {
            gateway.ask(&query, product.as_ref()).await
        }));
    }

    /// Collects the finished gateway call, if any, and appends its reply.
    /// Driven by the tick event so the transcript is only ever touched from
    /// the event loop.
    pub async fn poll_ask_task(&mut self) {
        let finished = self
            .ask_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.ask_task.take() {
            // A panicked task reads the same as a connection failure.
            let result = task
                .await
                .unwrap_or_else(|_| Ok(CONNECTION_FALLBACK.to_string()));
            self.conversation.complete(result);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Detail page scrolling
    pub fn detail_scroll_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn detail_scroll_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    /// Scroll the chat so the newest message (or the thinking indicator) is
    /// visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            40
        };

        let mut total_lines: u16 = 0;
        for msg in self.conversation.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        // Room for the "AI: Thinking..." indicator
        total_lines += 2;

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 16 };
        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::load_builtin().unwrap()
    }

    #[test]
    fn test_home_all_shows_everything() {
        let catalog = catalog();
        let shown = visible_products(catalog.products(), View::Home, "", ALL_CATEGORY);
        assert_eq!(shown.len(), catalog.products().len());
    }

    #[test]
    fn test_home_category_filter() {
        let catalog = catalog();
        let shown = visible_products(catalog.products(), View::Home, "", "Electronics");
        assert!(!shown.is_empty());
        assert!(shown.iter().all(|p| p.category == "Electronics"));
    }

    #[test]
    fn test_search_matches_title_brand_category() {
        let catalog = catalog();

        let by_brand = visible_products(catalog.products(), View::Search, "sony", ALL_CATEGORY);
        assert!(by_brand.iter().any(|p| p.brand == "Sony"));

        let by_title = visible_products(catalog.products(), View::Search, "macbook", ALL_CATEGORY);
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].brand, "Apple");

        let by_category = visible_products(catalog.products(), View::Search, "laptops", ALL_CATEGORY);
        assert!(by_category.iter().all(|p| p.category == "Laptops"));
    }

    #[test]
    fn test_search_no_match_is_empty() {
        let catalog = catalog();
        let shown = visible_products(catalog.products(), View::Search, "zzzz", ALL_CATEGORY);
        assert!(shown.is_empty());
    }

    #[test]
    fn test_blank_search_query_falls_back_to_category() {
        let catalog = catalog();
        let shown = visible_products(catalog.products(), View::Search, "   ", "Home");
        assert!(shown.iter().all(|p| p.category == "Home"));
    }
}
