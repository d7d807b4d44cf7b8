use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fee_estimator::{
    format_clp, format_number, format_uf, FetchError, FormState, IndexRateProvider,
    IndexRateQuote, IndexRateSource, Tier,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tokio::runtime::Handle;

type FetchOutcome = Result<IndexRateQuote, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Estimate,
    Rates,
    Notes,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Estimate => Page::Rates,
            Page::Rates => Page::Notes,
            Page::Notes => Page::Estimate,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Estimate => Page::Notes,
            Page::Rates => Page::Estimate,
            Page::Notes => Page::Rates,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Estimate => "Estimación",
            Page::Rates => "Rangos UF/m²",
            Page::Notes => "Alcance y notas",
        }
    }
}

/// Form field with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Area,
    IndexRate,
    Surcharge,
    ConstructionCost,
}

impl Field {
    const ORDER: [Field; 5] = [
        Field::Category,
        Field::Area,
        Field::IndexRate,
        Field::Surcharge,
        Field::ConstructionCost,
    ];

    pub fn next(&self) -> Self {
        let i = Self::ORDER.iter().position(|f| f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn previous(&self) -> Self {
        let i = Self::ORDER.iter().position(|f| f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn label(&self) -> &str {
        match self {
            Field::Category => "Tipo / destino",
            Field::Area => "Superficie (m²)",
            Field::IndexRate => "Valor UF (CLP)",
            Field::Surcharge => "Recargo (%)",
            Field::ConstructionCost => "Costo de obra (CLP/m²)",
        }
    }
}

/// Text as typed in each numeric box
#[derive(Debug, Clone, Default)]
pub struct InputBuffers {
    pub area: String,
    pub index_rate: String,
    pub surcharge: String,
    pub construction_cost: String,
}

pub struct App {
    pub form: FormState,
    pub page: Page,
    pub focus: Field,
    pub inputs: InputBuffers,
    pub notice: Option<String>,
    pub pending_fetches: usize,
    mailto: String,
    provider: IndexRateProvider,
    fetch_tx: Sender<FetchOutcome>,
    fetch_rx: Receiver<FetchOutcome>,
}

impl App {
    pub fn new(form: FormState, provider: IndexRateProvider, mailto: String) -> Self {
        let inputs = InputBuffers {
            area: format_number(form.area_sqm()),
            index_rate: format_number(form.index_rate()),
            surcharge: format_number(form.surcharge_percent()),
            construction_cost: form
                .construction_unit_cost()
                .map(format_number)
                .unwrap_or_default(),
        };
        let (fetch_tx, fetch_rx) = mpsc::channel();

        Self {
            form,
            page: Page::Estimate,
            focus: Field::Category,
            inputs,
            notice: None,
            pending_fetches: 0,
            mailto,
            provider,
            fetch_tx,
            fetch_rx,
        }
    }

    pub fn next_page(&mut self) {
        self.page = self.page.next();
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.previous();
    }

    /// Start an automatic UF fetch in the background.
    /// Fetches are not coordinated: whichever finishes last sets the value.
    pub fn request_fetch(&mut self, runtime: &Handle) {
        let provider = self.provider.clone();
        let tx = self.fetch_tx.clone();
        runtime.spawn(async move {
            let outcome = provider.fetch_current_rate().await;
            // Receiver is gone once the UI has exited
            let _ = tx.send(outcome);
        });
        self.pending_fetches += 1;
        self.notice = Some("Obteniendo UF automática...".to_string());
    }

    /// Apply every fetch result that has arrived since the last frame
    pub fn drain_fetch_results(&mut self) {
        while let Ok(outcome) = self.fetch_rx.try_recv() {
            self.pending_fetches = self.pending_fetches.saturating_sub(1);
            self.apply_fetch_outcome(outcome);
        }
    }

    fn apply_fetch_outcome(&mut self, outcome: FetchOutcome) {
        match self.form.apply_fetch_result(outcome) {
            Ok(rate) => {
                self.inputs.index_rate = format_number(rate);
                self.notice = Some(format!("UF automática: {}", format_clp(rate)));
            }
            Err(e) => {
                self.notice = Some(e.user_notice().to_string());
            }
        }
    }

    fn focused_buffer(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Category => None,
            Field::Area => Some(&mut self.inputs.area),
            Field::IndexRate => Some(&mut self.inputs.index_rate),
            Field::Surcharge => Some(&mut self.inputs.surcharge),
            Field::ConstructionCost => Some(&mut self.inputs.construction_cost),
        }
    }

    /// Push the focused buffer through its setter
    fn commit_focused(&mut self) {
        match self.focus {
            Field::Category => {}
            Field::Area => self.form.set_area_input(&self.inputs.area),
            Field::IndexRate => {
                self.form.set_index_rate_input(&self.inputs.index_rate);
                // A typed value under the minimum shows the clamped one
                if let Ok(typed) = self.inputs.index_rate.trim().parse::<f64>() {
                    if typed != self.form.index_rate() {
                        self.inputs.index_rate = format_number(self.form.index_rate());
                    }
                }
            }
            Field::Surcharge => self.form.set_surcharge_input(&self.inputs.surcharge),
            Field::ConstructionCost => self
                .form
                .set_construction_unit_cost_input(&self.inputs.construction_cost),
        }
    }

    pub fn type_char(&mut self, ch: char) {
        if let Some(buffer) = self.focused_buffer() {
            if ch.is_ascii_digit() || (ch == '.' && !buffer.contains('.')) {
                buffer.push(ch);
                self.commit_focused();
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(buffer) = self.focused_buffer() {
            buffer.pop();
            self.commit_focused();
        }
    }

    /// Returns true when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent, runtime: &Handle) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            KeyCode::Char('f') | KeyCode::F(5) => self.request_fetch(runtime),
            _ if self.page != Page::Estimate => {}
            KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::Up => self.focus = self.focus.previous(),
            KeyCode::Right if self.focus == Field::Category => self.form.next_category(),
            KeyCode::Left if self.focus == Field::Category => self.form.previous_category(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.type_char(ch),
            _ => {}
        }
        false
    }
}

pub fn run_ui(app: &mut App, runtime: &Handle) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, runtime);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runtime: &Handle,
) -> io::Result<()> {
    loop {
        app.drain_fetch_results();
        terminal.draw(|f| ui(f, app))?;

        // Poll so fetch results show up without a key press
        if !event::poll(Duration::from_millis(150))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key, runtime) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.page {
        Page::Estimate => render_estimate(f, chunks[1], app),
        Page::Rates => render_rates(f, chunks[1], app),
        Page::Notes => render_notes(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Estimate, Page::Rates, Page::Notes];

    let mut tab_spans = vec![Span::styled(
        "Calculadora de Precios · UF/m² → UF & CLP",
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    tab_spans.push(Span::raw("  |  "));

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn field_line(app: &App, field: Field, value: String, hint: Option<&str>) -> Line<'static> {
    let focused = app.page == Page::Estimate && app.focus == field;
    let marker = if focused { "→ " } else { "  " };
    let value_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(marker.to_string(), Style::default().fg(Color::Green)),
        Span::styled(
            format!("{:<24}", field.label()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, value_style),
    ];
    if let Some(hint) = hint {
        spans.push(Span::styled(
            format!("  {}", hint),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

fn render_estimate(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Inputs
            Constraint::Length(7), // Fee cards
            Constraint::Min(0),    // Construction reference
        ])
        .split(area);

    let source = match app.form.index_rate_source() {
        IndexRateSource::Default => "valor por defecto".to_string(),
        IndexRateSource::Manual => "manual".to_string(),
        IndexRateSource::Fetched { as_of: Some(d), .. } => format!("automática al {}", d.format("%d-%m-%Y")),
        IndexRateSource::Fetched { as_of: None, .. } => "automática".to_string(),
    };
    let surcharge_hint = "Para encargos aislados u otras condiciones especiales.";

    let inputs = vec![
        field_line(app, Field::Category, format!("◀ {} ▶", app.form.selected_category()), None),
        Line::from(Span::styled(
            format!("  {:<24}Rango UF/m²: {}", "", app.form.rate_band_line()),
            Style::default().fg(Color::DarkGray),
        )),
        field_line(app, Field::Area, app.inputs.area.clone(), None),
        field_line(app, Field::IndexRate, app.inputs.index_rate.clone(), Some(source.as_str())),
        field_line(app, Field::Surcharge, app.inputs.surcharge.clone(), Some(surcharge_hint)),
        field_line(app, Field::ConstructionCost, app.inputs.construction_cost.clone(), Some("Ej: 600000")),
        Line::from(""),
        Line::from(Span::styled(
            "  Si la UF automática falla, ingrésala manualmente (SII mensual).",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let input_panel = Paragraph::new(inputs).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Datos "),
    );
    f.render_widget(input_panel, chunks[0]);

    let card_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(chunks[1]);

    for (i, tier) in Tier::ALL.iter().enumerate() {
        render_fee_card(f, card_chunks[i], app, *tier);
    }

    let reference = match app.form.construction_reference() {
        Some(total) => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    "  Referencia de obra: ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format_clp(total), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    "  (no se usa en el cálculo de honorarios)",
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        ],
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Ingresa un costo de obra por m² para ver una referencia.",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let reference_panel = Paragraph::new(reference).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Construcción estimativa (opcional) "),
    );
    f.render_widget(reference_panel, chunks[2]);
}

fn render_fee_card(f: &mut Frame, area: Rect, app: &App, tier: Tier) {
    let fee = app.form.estimates().get(tier);
    let color = match tier {
        Tier::Low => Color::Green,
        Tier::Mid => Color::Yellow,
        Tier::High => Color::Red,
    };

    let content = vec![
        Line::from(Span::styled(
            format!(" {}", format_uf(fee.total_units)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {}", format_clp(fee.total_currency)),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}", app.form.basis_line(tier)),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let card = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", tier.label())),
    );
    f.render_widget(card, area);
}

fn render_rates(f: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["Tipo / destino", "Bajo", "Medio", "Alto"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selected = app.form.selected_category();
    let rows = app.form.table().rows().iter().map(|row| {
        let style = if row.name == selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(row.name),
            Cell::from(format_uf(row.rates.low)),
            Cell::from(format_uf(row.rates.mid)),
            Cell::from(format_uf(row.rates.high)),
        ])
        .style(style)
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(48),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Rangos UF/m² - honorarios de proyecto "),
    );

    f.render_widget(table, area);
}

const SCOPE: [&str; 3] = [
    "Desarrollo de proyecto con antecedentes para Permiso de Edificación y/o Recepción Final según aplique.",
    "Gestión y coordinación básica con especialistas (estructuras, instalaciones, eficiencia energética) según alcance contratado.",
    "Para “encargo aislado” de Recepción Final se considera estudio del expediente y ajustes mínimos a la planimetría.",
];

const NOTES: [&str; 3] = [
    "Los valores corresponden a honorarios de proyecto, no a costos de construcción.",
    "Para interiorismo, los rangos son del proyecto (no consideran mobiliario ni materiales de ejecución).",
    "El recargo aplica en encargos aislados o condiciones singulares (viajes, urgencias, etc.).",
];

const DISCLAIMER: &str = "Esta herramienta entrega rangos de referencia. La propuesta definitiva puede variar según complejidad, ubicación, normativa y alcance específico.";

fn render_notes(f: &mut Frame, area: Rect, app: &App) {
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            format!("  {}", text),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
    };
    let bullet = |text: &'static str| Line::from(format!("   • {}", text));

    let mut content = vec![Line::from(""), heading("Alcance general (proyecto)"), Line::from("")];
    content.extend(SCOPE.into_iter().map(bullet));
    content.extend([Line::from(""), heading("Notas"), Line::from("")]);
    content.extend(NOTES.into_iter().map(bullet));
    content.extend([
        Line::from(""),
        heading("Descargo"),
        Line::from(""),
        Line::from(format!("   {}", DISCLAIMER)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Solicitar cotización por correo: ", Style::default().fg(Color::Cyan)),
            Span::styled(app.mailto.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
    ]);

    let paragraph = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Alcance, notas y descargo "),
    );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if app.pending_fetches > 0 {
        status_spans.push(Span::styled(" ⟳ ", Style::default().fg(Color::Cyan)));
    }
    if let Some(notice) = &app.notice {
        status_spans.push(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Campo | "));
    status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Tipo | "));
    status_spans.push(Span::styled("f", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" UF automática | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Página | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Salir"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
