//! Spanish prose summaries of aggregated rows.
//!
//! Content selection is deterministic: [`analyze`] decides which facts a
//! paragraph states. Only the wording varies, through a [`PhraseChooser`].

use crate::analysis::format::{format_number, format_percentage, percentage};
use crate::model::{AggregatedRow, NarrativeParagraph, Report};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Shares below this count toward the long tail.
pub const LONG_TAIL_THRESHOLD: f64 = 5.0;
/// Minimum number of small categories reported as one combined clause.
pub const LONG_TAIL_MIN_CATEGORIES: usize = 3;

const OPENINGS: &[&str] = &["En", "Respecto de", "En lo que respecta a"];
const EMPTY: &[&str] = &["No se registran datos para", "No hay información disponible para"];
const ALL_ZERO: &[&str] = &[
    "ninguna de las categorías registra casos",
    "no se registran casos distintos de cero",
];
const SINGLE_CLOSINGS: &[&str] = &[
    "Esta cifra entrega una referencia para el área seleccionada.",
    "El dato permite dimensionar este aspecto en el territorio analizado.",
];
const LEADERS: &[&str] = &[
    "la categoría predominante es",
    "destaca",
    "el mayor valor corresponde a",
];
const FOLLOWERS: &[&str] = &["seguida de", "seguida por"];
const LONG_TAILS: &[&str] = &["En conjunto,", "Sumadas,"];
const MINORITIES: &[&str] = &["En contraste,", "En el otro extremo,"];

/// Source of phrasing variety.
pub trait PhraseChooser {
    /// Index in `0..len`; `len` is never zero.
    fn choose_index(&mut self, len: usize) -> usize;
}

pub struct RandomChooser<R> {
    rng: R,
}

impl RandomChooser<ThreadRng> {
    pub fn thread_local() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl RandomChooser<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> PhraseChooser for RandomChooser<R> {
    fn choose_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Always picks the same slot (modulo the pool size).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedChooser(pub usize);

impl PhraseChooser for FixedChooser {
    fn choose_index(&mut self, len: usize) -> usize {
        self.0 % len.max(1)
    }
}

fn pick<C: PhraseChooser + ?Sized>(chooser: &mut C, pool: &[&'static str]) -> &'static str {
    match pool {
        [] => "",
        _ => pool[chooser.choose_index(pool.len()).min(pool.len() - 1)],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub label: String,
    pub raw_value: f64,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongTail {
    pub labels: Vec<String>,
    pub share: f64,
}

/// What a paragraph will assert.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeFacts {
    Empty,
    Single {
        label: String,
        raw_value: f64,
        value: f64,
        percentage: Option<f64>,
    },
    AllZero {
        count: usize,
    },
    Ranked {
        leader: RankedItem,
        followers: Vec<RankedItem>,
        long_tail: Option<LongTail>,
        minority: Option<RankedItem>,
    },
}

impl NarrativeFacts {
    pub fn leader(&self) -> Option<&RankedItem> {
        match self {
            NarrativeFacts::Ranked { leader, .. } => Some(leader),
            _ => None,
        }
    }
}

/// Drops a leading "Total de "/"Total " and lower-cases whatever follows the
/// first comma.
pub fn clean_label(label: &str) -> String {
    let trimmed = label.trim();
    let base = ["Total de ", "Total "]
        .iter()
        .find_map(|prefix| {
            trimmed
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &trimmed[prefix.len()..])
        })
        .unwrap_or(trimmed)
        .trim();
    match base.split_once(',') {
        Some((head, tail)) => format!("{head},{}", tail.to_lowercase()),
        None => base.to_string(),
    }
}

/// Spanish "y" becomes "e" before an /i/ sound.
fn conjunction(next: &str) -> &'static str {
    let lower = next.trim_start().to_lowercase();
    let i_sound = lower.starts_with('i')
        || lower.starts_with('í')
        || ((lower.starts_with("hi") || lower.starts_with("hí"))
            && !lower.starts_with("hie")
            && !lower.starts_with("hia"));
    if i_sound { "e" } else { "y" }
}

pub fn join_spanish(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), conjunction(last), last),
    }
}

/// Classifies the rows of one report (or one category slice). Total and
/// subtotal rows, and the denominator column itself, are not part of the
/// statistical base. Ties keep input order.
pub fn analyze<'a, I>(rows: I, denominator: Option<&str>) -> NarrativeFacts
where
    I: IntoIterator<Item = &'a AggregatedRow>,
{
    let all: Vec<&AggregatedRow> = rows.into_iter().collect();
    let eligible: Vec<&AggregatedRow> = all
        .iter()
        .copied()
        .filter(|row| row.is_member())
        .filter(|row| denominator.is_none() || row.column.as_deref() != denominator)
        .collect();

    match eligible.as_slice() {
        [] => NarrativeFacts::Empty,
        [row] => NarrativeFacts::Single {
            label: clean_label(&row.label),
            raw_value: row.raw_value,
            value: row.value,
            percentage: row.percentage,
        },
        rows if rows.iter().all(|row| row.raw_value == 0.0) => {
            NarrativeFacts::AllZero { count: rows.len() }
        }
        rows => rank(rows, share_base(&all, rows, denominator)),
    }
}

/// What attached percentages were computed against: the total or subtotal
/// row, else the denominator column's row. Without attached percentages, or
/// when neither row is present, the eligible rows' own total.
fn share_base(all: &[&AggregatedRow], eligible: &[&AggregatedRow], denominator: Option<&str>) -> f64 {
    let eligible_total: f64 = eligible.iter().map(|row| row.raw_value).sum();
    if eligible.iter().all(|row| row.percentage.is_none()) {
        return eligible_total;
    }
    all.iter()
        .find(|row| row.is_total || row.is_subtotal)
        .or_else(|| {
            denominator.and_then(|column| {
                all.iter().find(|row| row.column.as_deref() == Some(column))
            })
        })
        .map(|row| row.raw_value)
        .filter(|raw| *raw != 0.0)
        .unwrap_or(eligible_total)
}

fn rank(rows: &[&AggregatedRow], base: f64) -> NarrativeFacts {
    let base_total: f64 = rows.iter().map(|row| row.raw_value).sum();
    let mut ranked: Vec<RankedItem> = rows
        .iter()
        .map(|row| RankedItem {
            label: clean_label(&row.label),
            raw_value: row.raw_value,
            value: row.value,
            percentage: row
                .percentage
                .or_else(|| percentage(row.raw_value, base_total))
                .unwrap_or(0.0),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(Ordering::Equal)
    });

    let mut items = ranked.into_iter();
    let Some(leader) = items.next() else {
        return NarrativeFacts::Empty;
    };
    let rest: Vec<RankedItem> = items.collect();

    let small = rest
        .iter()
        .filter(|item| item.percentage < LONG_TAIL_THRESHOLD)
        .count();
    if small >= LONG_TAIL_MIN_CATEGORIES {
        let (tail, followers): (Vec<RankedItem>, Vec<RankedItem>) = rest
            .into_iter()
            .partition(|item| item.percentage < LONG_TAIL_THRESHOLD);
        let tail_raw: f64 = tail.iter().map(|item| item.raw_value).sum();
        let share = percentage(tail_raw, base)
            .unwrap_or_else(|| tail.iter().map(|item| item.percentage).sum());
        return NarrativeFacts::Ranked {
            leader,
            followers,
            long_tail: Some(LongTail {
                labels: tail.into_iter().map(|item| item.label).collect(),
                share,
            }),
            minority: None,
        };
    }

    let mut followers = rest;
    let minority = if followers.len() >= 2 {
        followers.pop()
    } else {
        None
    };
    NarrativeFacts::Ranked {
        leader,
        followers,
        long_tail: None,
        minority,
    }
}

pub struct NarrativeGenerator<C> {
    chooser: C,
}

impl NarrativeGenerator<RandomChooser<ThreadRng>> {
    pub fn with_thread_rng() -> Self {
        Self::new(RandomChooser::thread_local())
    }
}

impl<C: PhraseChooser> NarrativeGenerator<C> {
    pub fn new(chooser: C) -> Self {
        Self { chooser }
    }

    pub fn paragraph<'a, I>(&mut self, title: &str, rows: I, denominator: Option<&str>) -> String
    where
        I: IntoIterator<Item = &'a AggregatedRow>,
    {
        let facts = analyze(rows, denominator);
        self.render(title, &facts)
    }

    pub fn render(&mut self, title: &str, facts: &NarrativeFacts) -> String {
        match facts {
            NarrativeFacts::Empty => {
                format!("{} {title}.", pick(&mut self.chooser, EMPTY))
            }
            NarrativeFacts::Single {
                label,
                raw_value,
                value,
                percentage,
            } => {
                let opening = self.opening(title);
                let body = if *raw_value == 0.0 {
                    format!("se registran cero casos de {label}.")
                } else {
                    match percentage {
                        Some(pct) => format!(
                            "se registran {} casos de {label}, equivalentes al {} del total.",
                            format_number(*value),
                            format_percentage(*pct)
                        ),
                        None => format!("se registran {} casos de {label}.", format_number(*value)),
                    }
                };
                let closing = pick(&mut self.chooser, SINGLE_CLOSINGS);
                format!("{opening}{body} {closing}")
            }
            NarrativeFacts::AllZero { .. } => {
                let opening = self.opening(title);
                format!("{opening}{}.", pick(&mut self.chooser, ALL_ZERO))
            }
            NarrativeFacts::Ranked {
                leader,
                followers,
                long_tail,
                minority,
            } => {
                let mut text = self.opening(title);
                text.push_str(&format!(
                    "{} {}, con {} casos ({})",
                    pick(&mut self.chooser, LEADERS),
                    leader.label,
                    format_number(leader.value),
                    format_percentage(leader.percentage)
                ));
                if !followers.is_empty() {
                    let listed: Vec<String> = followers
                        .iter()
                        .map(|item| format!("{} ({})", item.label, format_percentage(item.percentage)))
                        .collect();
                    text.push_str(&format!(
                        ", {} {}",
                        pick(&mut self.chooser, FOLLOWERS),
                        join_spanish(&listed)
                    ));
                }
                text.push('.');
                if let Some(tail) = long_tail {
                    text.push_str(&format!(
                        " {} {} categorías con menos de {}% cada una representan {}.",
                        pick(&mut self.chooser, LONG_TAILS),
                        tail.labels.len(),
                        LONG_TAIL_THRESHOLD,
                        format_percentage(tail.share)
                    ));
                }
                if let Some(item) = minority {
                    text.push_str(&format!(
                        " {} {} representa apenas {}.",
                        pick(&mut self.chooser, MINORITIES),
                        item.label,
                        format_percentage(item.percentage)
                    ));
                }
                text
            }
        }
    }

    /// One paragraph per category for per-category reports, one otherwise.
    pub fn describe_report(&mut self, report: &Report) -> Vec<NarrativeParagraph> {
        if report.denominator.is_per_category() {
            return report
                .categories()
                .into_iter()
                .map(|category| NarrativeParagraph {
                    heading: Some(category.to_string()),
                    text: self.paragraph(
                        &format!("{}: {}", report.title, category),
                        report.rows_in_category(category),
                        None,
                    ),
                })
                .collect();
        }
        vec![NarrativeParagraph {
            heading: None,
            text: self.paragraph(&report.title, &report.rows, report.denominator.column()),
        }]
    }

    fn opening(&mut self, title: &str) -> String {
        format!("{} {title}, ", pick(&mut self.chooser, OPENINGS))
    }
}
