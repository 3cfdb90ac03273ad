use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Row, Sparkline, Table, Wrap,
    },
};

use crate::app::{App, InputMode, View};
use crate::catalog::Product;
use crate::chat::ChatRole;

/// Style `**bold**` runs in a reply line. Segments between `**` markers
/// alternate plain/bold; an unpaired trailing marker renders as plain text.
fn markdown_bold_line(text: &str) -> Line<'static> {
    if !text.contains("**") {
        return Line::from(text.to_string());
    }

    let segments: Vec<&str> = text.split("**").collect();
    if segments.len() % 2 == 0 {
        // Unpaired marker, keep the line as written
        return Line::from(text.to_string());
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i % 2 == 1 {
            spans.push(Span::styled(
                segment.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(segment.to_string()));
        }
    }

    Line::from(spans)
}

/// Horizontal scroll offset that keeps the cursor inside a one-line input
/// of `inner_width` columns.
fn input_scroll_offset(cursor: usize, inner_width: usize) -> usize {
    if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view {
        View::Home => render_home(app, frame, body_area),
        View::Search => render_search(app, frame, body_area),
        View::ProductDetail => render_product_detail(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.show_chat {
        render_chat_panel(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let assistant_state = if app.gateway.is_configured() {
        format!(" [{}]", app.gateway.model())
    } else {
        " [AI offline]".to_string()
    };

    let title = Line::from(vec![
        Span::styled(" PricePulse ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("Stop Overpaying.", Style::default().fg(Color::Gray)),
        Span::styled(assistant_state, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = if app.show_chat {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        match (app.view, app.input_mode) {
            (_, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" search ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" cancel ", label_style),
            ],
            (View::Home, InputMode::Normal) => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" category ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" view ", label_style),
                Span::styled(" / ", key_style),
                Span::styled(" search ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" AI ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
            (View::Search, InputMode::Normal) => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" view ", label_style),
                Span::styled(" / ", key_style),
                Span::styled(" search ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" AI ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" home ", label_style),
            ],
            (View::ProductDetail, InputMode::Normal) => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" ask AI ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" back ", label_style),
            ],
        }
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_search_bar(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = input_scroll_offset(app.search_cursor, inner_width);

    let content = if app.search_input.is_empty() && !editing {
        Span::styled(
            "Search products, brands, categories...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        let visible: String = app
            .search_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Span::raw(visible)
    };

    let input = Paragraph::new(Line::from(content)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Search "),
    );
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.search_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn product_list_item(product: &Product) -> ListItem<'static> {
    let price_line = match (product.best_offer(), product.offers.len()) {
        (Some(best), count) => format!(
            "from ${:.2} at {} · {} stores",
            best.price, best.store_name, count
        ),
        (None, _) => "no offers".to_string(),
    };

    ListItem::new(Text::from(vec![
        Line::from(Span::styled(
            product.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("{} · {} ", product.category, product.brand),
                Style::default().fg(Color::Blue),
            ),
            Span::styled(
                format!("★ {} ({}) ", product.rating, product.review_count),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(price_line, Style::default().fg(Color::Green)),
        ]),
        Line::default(),
    ]))
}

fn render_product_list(app: &mut App, frame: &mut Frame, area: Rect, title: String) {
    let visible = app.visible();

    if visible.is_empty() {
        let empty = Paragraph::new("No products found matching your criteria.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = visible.iter().map(|p| product_list_item(p)).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.product_state);
}

fn render_home(app: &mut App, frame: &mut Frame, area: Rect) {
    let [search_area, category_area, list_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_search_bar(app, frame, search_area);

    // Category tab row
    let mut tabs: Vec<Span> = Vec::new();
    for category in app.category_row() {
        let style = if category == app.active_category {
            Style::default().bg(Color::Blue).fg(Color::White).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        tabs.push(Span::styled(format!(" {} ", category), style));
        tabs.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(tabs)), category_area);

    let title = if app.active_category == crate::app::ALL_CATEGORY {
        " Trending Now ".to_string()
    } else {
        format!(" {} Deals ", app.active_category)
    };
    render_product_list(app, frame, list_area, title);
}

fn render_search(app: &mut App, frame: &mut Frame, area: Rect) {
    let [search_area, list_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

    render_search_bar(app, frame, search_area);

    let count = app.visible().len();
    let title = format!(" Results for \"{}\" ({}) ", app.search_input.trim(), count);
    render_product_list(app, frame, list_area, title);
}

fn render_product_detail(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(product) = app.selected_product() else {
        frame.render_widget(
            Paragraph::new("Product not found")
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let [info_area, right_area] = Layout::horizontal([
        Constraint::Percentage(45),
        Constraint::Percentage(55),
    ])
    .areas(area);

    // Left: title, rating, description, best price, specs
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            product.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("★ {} ({} reviews)", product.rating, product.review_count),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("  |  "),
            Span::styled(product.brand.clone(), Style::default().fg(Color::Blue)),
        ]),
        Line::default(),
    ];

    for line in product.description.lines() {
        lines.push(Line::from(line.to_string()));
    }
    lines.push(Line::default());

    if let Some(best) = product.best_offer() {
        lines.push(Line::from(vec![
            Span::styled("Best Price: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("${:.2}", best.price),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" at {} · {} Shipping · {}", best.store_name, best.shipping, best.condition.as_str()),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled(
        "Key Specifications",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for (key, value) in &product.specs {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", key), Style::default().fg(Color::Gray)),
            Span::raw(value.clone()),
        ]));
    }

    let info = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", product.category)),
        );
    frame.render_widget(info, info_area);

    // Right: price history chart on top, offer table below
    let [chart_area, offers_area] =
        Layout::vertical([Constraint::Length(8), Constraint::Min(0)]).areas(right_area);

    render_price_chart(product, frame, chart_area);
    render_offer_table(product, frame, offers_area);
}

fn render_price_chart(product: &Product, frame: &mut Frame, area: Rect) {
    let prices: Vec<u64> = product
        .price_history
        .iter()
        .map(|p| p.price.round().max(0.0) as u64)
        .collect();

    let title = match (
        product.price_history.iter().map(|p| p.price).fold(f64::INFINITY, f64::min),
        product.price_history.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max),
    ) {
        (min, max) if min.is_finite() && max.is_finite() => {
            format!(" Price History  low ${:.0} · high ${:.0} ", min, max)
        }
        _ => " Price History ".to_string(),
    };

    let chart = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&prices)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(chart, area);
}

fn render_offer_table(product: &Product, frame: &mut Frame, area: Rect) {
    let offers = product.offers_by_price();

    let header = Row::new(vec!["Store", "Condition", "Shipping", "Price", ""])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = offers
        .iter()
        .enumerate()
        .map(|(idx, offer)| {
            let marker = if idx == 0 { "Best Deal" } else { "" };
            Row::new(vec![
                offer.store_name.clone(),
                offer.condition.as_str().to_string(),
                offer.shipping.clone(),
                format!("${:.2}", offer.price),
                marker.to_string(),
            ])
            .style(if idx == 0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            })
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Min(0),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Compare Prices from {} Stores ", offers.len())),
    );

    frame.render_widget(table, area);
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    // Floating panel pinned to the bottom-right corner
    let width = area.width.min(52);
    let height = area.height.min(22);
    let panel = Rect::new(
        area.right().saturating_sub(width),
        area.bottom().saturating_sub(height + 1),
        width,
        height,
    );

    frame.render_widget(Clear, panel);

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(panel);

    // Inner size minus borders, for scroll/wrap calculations
    app.chat_height = messages_area.height.saturating_sub(2);
    app.chat_width = messages_area.width.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.conversation.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.text.clone()));
                lines.push(Line::default());
            }
            ChatRole::Model => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(markdown_bold_line(line));
                }
                lines.push(Line::default());
            }
        }
    }

    if app.conversation.is_pending() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let messages = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" PricePulse AI "),
        );
    frame.render_widget(messages, messages_area);

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = input_scroll_offset(app.chat_cursor, inner_width);

    let input_content = if app.chat_input.is_empty() {
        Span::styled(
            "Ask about price or specs...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        let visible: String = app
            .chat_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Span::raw(visible)
    };
    let input = Paragraph::new(Line::from(input_content)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Ask "),
    );
    frame.render_widget(input, input_area);

    // The panel owns the keyboard while open, so the cursor lives here
    let cursor_x = (app.chat_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
}
