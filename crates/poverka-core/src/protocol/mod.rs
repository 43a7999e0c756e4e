//! Verification protocol generation.
//!
//! A protocol is laid out section by section from a [`ProtocolData`]
//! snapshot, rendered to an A4 PDF and written to the documents directory as
//! `Протокол_<number>_<yyyyMMdd_HHmmss>.pdf`.
//!
//! If a section cannot be laid out, the remaining sections are replaced by an
//! error note and the partial document is still written. The outcome carries
//! the error message so the caller can report it.
//!
//! # Example
//!
//! ```no_run
//! use poverka_core::protocol::{ProtocolConfig, ProtocolData, write_protocol};
//! use poverka_core::VerificationSession;
//! use time::OffsetDateTime;
//!
//! let session = VerificationSession::new();
//! let now = OffsetDateTime::now_utc();
//! let data = ProtocolData::from_session(&session, now.date());
//! let outcome = write_protocol(&data, &ProtocolConfig::default(), "protocols".as_ref(), now)?;
//! println!("Saved {}", outcome.path.display());
//! # Ok::<(), poverka_core::Error>(())
//! ```

mod fonts;
mod layout;
mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use poverka_types::{
    ClimateConditions, TransformFunction, VerificationStatus, format_date_long,
};

use crate::calibration::{MeasurementGroup, RangeBounds, forward_scale_mark};
use crate::error::{Error, Result};
use crate::session::VerificationSession;
use crate::status::OperationStatus;
use crate::units::{device_unit, reading_unit};

pub use fonts::{FontChoice, resolve_font, transliterate};
pub use layout::{Align, Block, Cell, ProtocolLayout, Table, wrap};
pub use render::{RenderedProtocol, render};

/// Font size of body text, in points.
pub const BODY_FONT_SIZE: f32 = 9.0;

/// Font size of the measurement table, in points.
pub const TABLE_FONT_SIZE: f32 = 7.0;

/// Marker appended to out-of-tolerance values.
pub const EXCEEDED_MARK: &str = "*";

/// Fixed texts of the protocol that differ between laboratories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub organization: String,
    pub address: String,
    /// Reference instrument used for the verification.
    pub calibrator: String,
    pub methodology_code: String,
    pub methodology_title: String,
    pub current_kind: String,
    pub mechanism: String,
    pub verifier_position: String,
    pub verifier_name: String,
    /// Maximum allowed reduced error, in percent.
    pub max_allowed_error: f64,
    /// TrueType font with Cyrillic glyphs.
    pub font_path: Option<PathBuf>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            organization: "АО \"Уралэлемент\"".to_string(),
            address: "456800, Челябинская обл., г. Верхний Уфалей, ул. Дмитриева д.24".to_string(),
            calibrator: "Калибратор-компаратор универсальный КМ300КНТ №334/175/198".to_string(),
            methodology_code: "ГОСТ 8.497-83".to_string(),
            methodology_title: "Государственная система обеспечения единства измерений (ГСИ). \
                                Амперметры, вольтметры, ваттметры, варметры. Методика поверки."
                .to_string(),
            current_kind: "Постоянный".to_string(),
            mechanism: "Магнитоэлектрический".to_string(),
            verifier_position: "Слесарь КИП и А".to_string(),
            verifier_name: "Суслов А.В.".to_string(),
            max_allowed_error: crate::calibration::DEFAULT_MAX_ALLOWED_ERROR,
            font_path: None,
        }
    }
}

/// Everything a protocol shows about one verification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolData {
    pub protocol_number: String,
    pub device_number: String,
    pub device_type: String,
    pub device_model: String,
    pub lower_range: String,
    pub upper_range: String,
    pub registry_number: String,
    pub accuracy_class: String,
    pub conditions: ClimateConditions,
    pub transform: TransformFunction,
    pub status: VerificationStatus,
    pub verification_date: Date,
    pub groups: Vec<MeasurementGroup>,
}

impl ProtocolData {
    /// Snapshot a session. The status is taken as last determined, or
    /// pending when nothing was measured. Malformed range bounds are shown
    /// with their defaults.
    pub fn from_session(session: &VerificationSession, verification_date: Date) -> Self {
        let range = session.range();
        Self {
            protocol_number: session.protocol_number.clone(),
            device_number: session.device_number.clone(),
            device_type: session.device_type.clone(),
            device_model: session.device_model.clone(),
            lower_range: range.lower.to_string(),
            upper_range: range.upper.to_string(),
            registry_number: session.registry_number.clone(),
            accuracy_class: session.accuracy_class.clone(),
            conditions: session.conditions.clone(),
            transform: session.transform(),
            status: if session.has_readings() {
                session.status()
            } else {
                VerificationStatus::Pending
            },
            verification_date,
            groups: session.groups().to_vec(),
        }
    }

    fn range(&self) -> RangeBounds {
        RangeBounds::parse(&self.lower_range, &self.upper_range)
    }

    fn unit(&self) -> &'static str {
        device_unit(&self.device_type)
    }
}

/// File name of a protocol generated at `now`.
///
/// Path separators in the protocol number are replaced so the file always
/// lands in the documents directory.
pub fn protocol_file_name(protocol_number: &str, now: OffsetDateTime) -> String {
    let stamp_format = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now
        .format(&stamp_format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    let number: String = protocol_number
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("Протокол_{number}_{stamp}.pdf")
}

type Section = fn(&ProtocolData, &ProtocolConfig) -> Result<Vec<Block>>;

const SECTIONS: [Section; 7] = [
    header_section,
    device_section,
    conditions_section,
    inspection_section,
    measurement_section,
    conclusion_section,
    signature_section,
];

/// Lay out the whole protocol.
///
/// A failing section stops the layout; an error note is appended and the
/// message is kept in [`ProtocolLayout::section_error`].
pub fn layout_protocol(data: &ProtocolData, config: &ProtocolConfig) -> ProtocolLayout {
    let mut blocks = Vec::new();
    let mut section_error = None;
    for section in SECTIONS {
        match section(data, config) {
            Ok(mut section_blocks) => blocks.append(&mut section_blocks),
            Err(e) => {
                warn!("Protocol section failed: {e}");
                blocks.push(Block::text(format!(
                    "Произошла ошибка при формировании документа: {e}"
                )));
                blocks.push(Block::text("Обратитесь к разработчику."));
                section_error = Some(e.to_string());
                break;
            }
        }
    }
    ProtocolLayout {
        title: format!("Протокол поверки №{}", data.protocol_number),
        blocks,
        section_error,
    }
}

fn header_section(data: &ProtocolData, config: &ProtocolConfig) -> Result<Vec<Block>> {
    Ok(vec![
        Block::centered(config.organization.as_str()),
        Block::centered(config.address.as_str()),
        Block::Space(2.0),
        Block::row(
            &[60.0, 25.0, 15.0],
            vec![
                Cell::new("Периодическая поверка").left(),
                Cell::new("Протокол №"),
                Cell::new(data.protocol_number.as_str()).underlined(),
            ],
        ),
    ])
}

fn device_section(data: &ProtocolData, config: &ProtocolConfig) -> Result<Vec<Block>> {
    Ok(vec![
        Block::row(
            &[10.0, 14.0, 6.0, 13.0, 4.0, 12.0, 21.0, 20.0],
            vec![
                Cell::new("поверен").left(),
                Cell::new(data.device_type.as_str()).left().underlined(),
                Cell::new("типа").left(),
                Cell::new(data.device_model.as_str()).left().underlined(),
                Cell::new("№").left(),
                Cell::new(data.device_number.as_str()).left().underlined(),
                Cell::new("диапазоны измерения").left(),
                Cell::new(format!(
                    "{} - {} {}",
                    data.lower_range,
                    data.upper_range,
                    data.unit()
                ))
                .left()
                .underlined(),
            ],
        ),
        Block::row(
            &[30.0, 70.0],
            vec![
                Cell::new("Номер в госреестре СИ").left(),
                Cell::new(data.registry_number.as_str()).left().underlined(),
            ],
        ),
        Block::row(
            &[8.0, 16.0, 24.0, 30.0, 14.0, 8.0],
            vec![
                Cell::new("Род тока").left(),
                Cell::new(config.current_kind.as_str()).left().underlined(),
                Cell::new("измерительный механизм").left(),
                Cell::new(config.mechanism.as_str()).left().underlined(),
                Cell::new("класс точности").left(),
                Cell::new(format!("{}%", data.accuracy_class))
                    .left()
                    .underlined(),
            ],
        ),
        Block::row(
            &[35.0, 65.0],
            vec![
                Cell::new("Поверка проведена с применением:").left(),
                Cell::new(config.calibrator.as_str()).underlined(),
            ],
        ),
    ])
}

fn conditions_section(data: &ProtocolData, config: &ProtocolConfig) -> Result<Vec<Block>> {
    let c = &data.conditions;
    Ok(vec![
        Block::row(
            &[20.0, 20.0, 30.0, 30.0],
            vec![
                Cell::new("Условия поверки:").left(),
                Cell::new(format!("температура {} °C,", c.temperature)).underlined(),
                Cell::new(format!("относительная влажность {} %,", c.humidity)).underlined(),
                Cell::new(format!("Атм. давление {} кПа", c.pressure)).underlined(),
            ],
        ),
        Block::text("Методика поверки:"),
        Block::row(
            &[25.0, 75.0],
            vec![
                Cell::new(config.methodology_code.as_str()).left(),
                Cell::new(config.methodology_title.as_str()).underlined(),
            ],
        ),
    ])
}

fn inspection_section(_data: &ProtocolData, config: &ProtocolConfig) -> Result<Vec<Block>> {
    let code = &config.methodology_code;
    Ok(vec![
        Block::text("1. Внешний осмотр"),
        Block::underlined(format!("Соответствует п.4.1. {code}")),
        Block::text("2. Опробование"),
        Block::underlined(format!("Соответствует п.4.2. {code}")),
    ])
}

fn fmt2(v: f64) -> String {
    format!("{v:.2}")
}

fn error_cell(value: f64, max_allowed: f64) -> Cell {
    if value.abs() > max_allowed {
        Cell::new(format!("{value:.2}%{EXCEEDED_MARK}"))
    } else {
        Cell::new(format!("{value:.2}%"))
    }
}

fn measurement_table(data: &ProtocolData, group: &MeasurementGroup) -> Result<Table> {
    let range = data.range();
    let unit = data.unit();
    let transformed = data.transform.is_transformed();
    let ref_unit = reading_unit(data.transform, &data.device_type);
    let set_unit = data.transform.reading_unit().unwrap_or("—");

    let header = vec![
        vec![
            Cell::new(format!("Точка\n{unit}")),
            Cell::new(format!("Задано\n{set_unit}")),
            Cell::new(format!("Эталон\n{ref_unit}")).span(2),
            Cell::new(format!("Преобразовано\n{unit}")).span(2),
            Cell::new("Погрешность\n%").span(2),
            Cell::new("Вариация"),
        ],
        vec![
            Cell::new(""),
            Cell::new(""),
            Cell::new("при подъеме"),
            Cell::new("при спуске"),
            Cell::new("при подъеме"),
            Cell::new("при спуске"),
            Cell::new("при подъеме"),
            Cell::new("при спуске"),
            Cell::new(""),
        ],
    ];

    let mut body = Vec::with_capacity(group.len() + 1);
    for (index, p) in group.points().iter().enumerate() {
        let values = [
            p.scale_mark(),
            p.reference_ascending(),
            p.reference_descending(),
            p.error_ascending(),
            p.error_descending(),
            p.variation(),
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Layout(format!(
                "недопустимое значение в точке {} группы \"{}\"",
                index + 1,
                group.name
            )));
        }
        let optional = |v: f64| if transformed { fmt2(v) } else { String::new() };
        body.push(vec![
            Cell::new(format!("{:.1}", p.scale_mark())),
            Cell::new(optional(forward_scale_mark(
                p.scale_mark(),
                data.transform,
                range.span(),
            ))),
            Cell::new(fmt2(p.reference_ascending())),
            Cell::new(fmt2(p.reference_descending())),
            Cell::new(optional(p.transformed_ascending())),
            Cell::new(optional(p.transformed_descending())),
            error_cell(p.error_ascending(), group.max_allowed_error),
            error_cell(p.error_descending(), group.max_allowed_error),
            Cell::new(fmt2(p.variation())),
        ]);
    }

    let mut max_row = vec![Cell::new("Макс.")];
    max_row.extend((0..5).map(|_| Cell::new("—")));
    max_row.push(error_cell(group.max_error_ascending(), group.max_allowed_error));
    max_row.push(error_cell(group.max_error_descending(), group.max_allowed_error));
    max_row.push(Cell::new(fmt2(group.max_variation())));
    body.push(max_row);

    Ok(Table {
        columns: vec![0.9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        header,
        body,
        font_size: TABLE_FONT_SIZE,
    })
}

fn measurement_section(data: &ProtocolData, _config: &ProtocolConfig) -> Result<Vec<Block>> {
    let mut blocks = vec![Block::text("3. Определение основной приведенной погрешности")];

    let groups: Vec<&MeasurementGroup> = data.groups.iter().filter(|g| !g.is_empty()).collect();
    if groups.is_empty() {
        blocks.push(Block::text("Нет данных измерений"));
    }

    let mut any_exceeded = false;
    for group in &groups {
        if data.groups.len() > 1 {
            blocks.push(Block::text(group.name.as_str()));
        }
        blocks.push(Block::Space(1.0));
        blocks.push(Block::Table(measurement_table(data, group)?));

        let verdict = if group.has_errors() {
            any_exceeded = true;
            "НЕ СООТВЕТСТВУЕТ"
        } else {
            "СООТВЕТСТВУЕТ"
        };
        blocks.push(Block::centered(format!(
            "Результат: {verdict} (допуск ±{}%)",
            group.max_allowed_error
        )));
    }
    if any_exceeded {
        blocks.push(Block::Paragraph {
            text: format!("{EXCEEDED_MARK} превышение допускаемой погрешности"),
            size: TABLE_FONT_SIZE,
            align: Align::Left,
            underline: false,
        });
    }

    blocks.push(Block::text("4. Остаточное отклонение указателя"));
    blocks.push(Block::underlined("Соответствует п. 6.6.2 ГОСТ 8711-93"));
    Ok(blocks)
}

fn conclusion_section(data: &ProtocolData, _config: &ProtocolConfig) -> Result<Vec<Block>> {
    Ok(vec![
        Block::Space(2.0),
        Block::text(format!("Вывод: {}", data.status.verdict())),
        Block::text(format!(
            "Дата поверки: {}",
            format_date_long(data.verification_date)
        )),
    ])
}

fn signature_section(_data: &ProtocolData, config: &ProtocolConfig) -> Result<Vec<Block>> {
    let line = "_________________";
    Ok(vec![
        Block::Space(6.0),
        Block::row(
            &[10.0, 30.0, 30.0, 30.0],
            vec![
                Cell::new("Поверитель").left(),
                Cell::new(format!("{}\n{line}\nдолжность", config.verifier_position)),
                Cell::new(format!("\n{line}\nподпись")),
                Cell::new(format!("{}\n{line}\nрасшифровка", config.verifier_name)),
            ],
        ),
    ])
}

/// Result of writing a protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolOutcome {
    pub path: PathBuf,
    pub pages: usize,
    /// Set when a section failed and the document holds an error note.
    pub section_error: Option<String>,
    pub font: FontChoice,
}

impl ProtocolOutcome {
    /// Typed status for the caller: success with the path, or the section
    /// error message.
    pub fn status(&self) -> OperationStatus<String> {
        match &self.section_error {
            Some(msg) => OperationStatus::Error(msg.clone()),
            None => OperationStatus::Success(self.path.display().to_string()),
        }
    }
}

/// Lay out, render and write a protocol into `dir`.
pub fn write_protocol(
    data: &ProtocolData,
    config: &ProtocolConfig,
    dir: &Path,
    now: OffsetDateTime,
) -> Result<ProtocolOutcome> {
    fs::create_dir_all(dir)?;
    let layout = layout_protocol(data, config);
    let font = resolve_font(config.font_path.as_deref());
    let rendered = render(&layout, &font)?;

    let path = dir.join(protocol_file_name(&data.protocol_number, now));
    fs::write(&path, &rendered.bytes)?;
    info!("Protocol written to {} ({} pages)", path.display(), rendered.pages);

    Ok(ProtocolOutcome {
        path,
        pages: rendered.pages,
        section_error: layout.section_error,
        font: rendered.font,
    })
}

/// A generated protocol file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// PDF files in `dir`, newest first. A missing directory is created.
pub fn list_protocols(dir: &Path) -> Result<Vec<ProtocolFile>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        let metadata = entry.metadata()?;
        if !metadata.is_file() || !is_pdf {
            continue;
        }
        files.push(ProtocolFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }
    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
    Ok(files)
}
