use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Terminal;

use crate::controller::DataSourceController;
use crate::market::{MarketFeed, MarketSnapshot};
use crate::rpc::LedgerClient;
use crate::types::{DashboardView, Side, TradeStatus, Valuation};

struct App<C> {
    controller: Arc<DataSourceController<C>>,
    feed: MarketFeed,
    wallet: Option<String>,
    uptime: Instant,
    should_quit: bool,
    scroll_offset: usize,
}

impl<C: LedgerClient + 'static> App<C> {
    fn spawn_toggle(&self) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move { controller.toggle_demo().await });
    }

    fn spawn_refresh(&self) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move { controller.refresh().await });
    }
}

pub async fn run<C: LedgerClient + 'static>(
    controller: Arc<DataSourceController<C>>,
    feed: MarketFeed,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let wallet = controller.identity().map(|k| k.to_string());
    let mut app = App {
        controller,
        feed,
        wallet,
        uptime: Instant::now(),
        should_quit: false,
        scroll_offset: 0,
    };
    let result = run_app(&mut terminal, &mut app, duration).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.feed.stop();
    result
}

async fn run_app<C: LedgerClient + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<C>,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    {
        let controller = Arc::clone(&app.controller);
        tokio::spawn(async move { controller.mount().await });
    }

    // 0 runs until quit
    let run_duration = (duration > 0).then(|| Duration::from_secs(duration));

    while !app.should_quit && run_duration.map_or(true, |d| app.uptime.elapsed() < d) {
        let view = app.controller.snapshot();
        let market = app.feed.latest();
        terminal.draw(|f| draw(f, app, &view, market.as_ref()))?;

        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        KeyCode::Char('d') => app.spawn_toggle(),
                        KeyCode::Char('r') => app.spawn_refresh(),
                        KeyCode::Up => {
                            if app.scroll_offset > 0 {
                                app.scroll_offset -= 1;
                            }
                        }
                        KeyCode::Down => {
                            app.scroll_offset = app.scroll_offset.saturating_add(1);
                        }
                        _ => {}
                    }
                }
            }
        }
        // Let spawned fetches progress between frames.
        tokio::task::yield_now().await;
    }

    Ok(())
}

fn draw<C>(f: &mut ratatui::Frame, app: &App<C>, view: &DashboardView, market: Option<&MarketSnapshot>) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // header
            Constraint::Length(4),  // stats
            Constraint::Min(10),    // trade journal
            Constraint::Length(10), // market
        ])
        .split(size);

    draw_header(f, app, view, chunks[0]);
    draw_stats(f, view, chunks[1]);
    draw_trades(f, app, view, chunks[2]);
    draw_market(f, market, chunks[3]);
}

fn draw_header<C>(f: &mut ratatui::Frame, app: &App<C>, view: &DashboardView, area: Rect) {
    let (mode, mode_color) = if view.is_demo {
        ("SIM MODE", Color::Yellow)
    } else {
        ("LIVE MODE", Color::Green)
    };
    let wallet = app.wallet.as_deref().unwrap_or("not connected");
    let mut header = vec![
        Span::styled(" DERIVERSE ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(mode, Style::default().fg(mode_color).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::raw(format!("Balance: {:.3} SOL", view.balance)),
        Span::raw(" | "),
        Span::styled(format!("Wallet: {}", short_key(wallet)), Style::default().fg(Color::Blue)),
        Span::raw(" | "),
        Span::raw(format!("Uptime: {}s", app.uptime.elapsed().as_secs())),
    ];
    if view.is_loading {
        header.push(Span::raw(" | "));
        header.push(Span::styled("loading...", Style::default().fg(Color::Magenta)));
    }
    header.push(Span::raw(" | "));
    header.push(Span::styled("q=quit d=demo r=refresh", Style::default().fg(Color::DarkGray)));

    let p = Paragraph::new(Line::from(header))
        .block(Block::default().borders(Borders::ALL).title(" Pro Analytics "));
    f.render_widget(p, area);
}

fn short_key(key: &str) -> String {
    if key.len() > 12 {
        format!("{}..{}", &key[..4], &key[key.len() - 4..])
    } else {
        key.to_string()
    }
}

fn draw_stats(f: &mut ratatui::Frame, view: &DashboardView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20); 5])
        .split(area);

    let stats = &view.stats;
    let pnl_color = if stats.net_pnl >= 0.0 { Color::Green } else { Color::Red };
    let win_color = if stats.win_rate > 50.0 { Color::Green } else { Color::Red };
    let cards = [
        ("Net PnL", format!("${:.2}", stats.net_pnl), pnl_color),
        ("Win Rate", format!("{:.1}%", stats.win_rate), win_color),
        ("Volume", format!("${:.1}k", stats.volume / 1000.0), Color::White),
        ("Trades", format!("{}", stats.total_trades), Color::White),
        ("Fees (est.)", format!("~${:.2}", stats.estimated_fees), Color::DarkGray),
    ];
    for (i, (label, value, color)) in cards.into_iter().enumerate() {
        let p = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL).title(format!(" {label} ")));
        f.render_widget(p, chunks[i]);
    }
}

fn draw_trades<C>(f: &mut ratatui::Frame, app: &App<C>, view: &DashboardView, area: Rect) {
    let max_visible = (area.height as usize).saturating_sub(3);
    let total = view.trades.len();

    // Newest first in the journal.
    let rows: Vec<Row> = view
        .trades
        .iter()
        .rev()
        .skip(app.scroll_offset)
        .take(max_visible)
        .map(|t| {
            let side_color = match t.side {
                Side::Long => Color::Green,
                Side::Short => Color::Red,
            };
            let status_color = match t.status {
                TradeStatus::Liquidated => Color::Red,
                TradeStatus::Closed => Color::Cyan,
                _ => Color::White,
            };
            let time = chrono::DateTime::from_timestamp_millis(t.timestamp)
                .map(|d| d.format("%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let (price, size, pnl) = match t.valuation {
                Valuation::Unavailable => ("n/a".to_string(), "n/a".to_string(), "n/a".to_string()),
                _ => (
                    format!("{:.2}", t.price),
                    format!("{:.2}", t.size),
                    t.pnl.map(|p| format!("{:+.2}", p)).unwrap_or_else(|| "-".into()),
                ),
            };
            Row::new(vec![
                Cell::from(time),
                Cell::from(t.symbol.clone()),
                Cell::from(Span::styled(t.side.to_string(), Style::default().fg(side_color))),
                Cell::from(price),
                Cell::from(size),
                Cell::from(pnl),
                Cell::from(Span::styled(t.status.to_string(), Style::default().fg(status_color))),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["TIME", "SYMBOL", "SIDE", "PRICE", "SIZE", "PNL", "STATUS"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::White)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(" Trade Journal ({}) ", total)));

    f.render_widget(table, area);
}

fn draw_market(f: &mut ratatui::Frame, market: Option<&MarketSnapshot>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let Some(snap) = market else {
        let p = Paragraph::new("Initializing terminal...")
            .block(Block::default().borders(Borders::ALL).title(" Market "));
        f.render_widget(p, area);
        return;
    };

    // Ticker + latest indicators
    let change_color = if snap.ticker.change_pct >= 0.0 { Color::Green } else { Color::Red };
    let fmt_opt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".into());
    let last = snap.chart.last();
    let ticker_text = vec![
        Line::from(vec![
            Span::styled(format!("  {} ", snap.symbol), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("{:.2}", snap.ticker.last_price), Style::default().fg(change_color)),
            Span::styled(format!("  {:+.2}%", snap.ticker.change_pct), Style::default().fg(change_color)),
        ]),
        Line::from(""),
        Line::from(format!(
            "  SMA20={}  EMA9={}  RSI14={}",
            fmt_opt(last.and_then(|p| p.sma20)),
            fmt_opt(last.and_then(|p| p.ema9)),
            fmt_opt(last.and_then(|p| p.rsi14)),
        )),
        Line::from(format!(
            "  BB=[{} / {}]  MACD hist={}",
            fmt_opt(last.and_then(|p| p.bands).map(|b| b.lower)),
            fmt_opt(last.and_then(|p| p.bands).map(|b| b.upper)),
            fmt_opt(last.and_then(|p| p.macd).map(|m| m.histogram)),
        )),
        Line::from(Span::styled(
            format!("  {} candles", snap.chart.len()),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let ticker_widget = Paragraph::new(ticker_text)
        .block(Block::default().borders(Borders::ALL).title(" Market "));
    f.render_widget(ticker_widget, chunks[0]);

    // Order book: nearest asks above nearest bids
    let depth = (chunks[1].height as usize).saturating_sub(3) / 2;
    let ask_rows = snap.book.asks.iter().rev().take(depth).rev().map(|l| (l, Color::Red));
    let bid_rows = snap.book.bids.iter().take(depth).map(|l| (l, Color::Green));
    let book_rows: Vec<Row> = ask_rows
        .chain(bid_rows)
        .map(|(l, color)| {
            Row::new(vec![
                Cell::from(Span::styled(format!("{:.2}", l.price), Style::default().fg(color))),
                Cell::from(format!("{:.3}", l.size)),
                Cell::from(format!("{:.3}", l.total)),
            ])
        })
        .collect();
    let book_table = Table::new(
        book_rows,
        [Constraint::Length(12), Constraint::Length(12), Constraint::Min(12)],
    )
    .header(Row::new(vec!["PRICE", "SIZE", "TOTAL"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(" Order Book "));
    f.render_widget(book_table, chunks[1]);
}
