//! Text Field Extractor for a single class ("turma") block.
//!
//! Each field has its own pattern and is matched independently of the
//! others, so fields may appear in any order. A missing label is not an
//! error: counters fall back to 0 and text fields to `None`.

use crate::types::Class;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"TURMA:\s*(\d+)").expect("number regex"));

static PREFERENTIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Preferencial:\s*(SIM|NÃO)").expect("preferential regex"));

static TIMES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Tempos:\s*(.*?)\s*(?:Local das Aulas:|Docente:)").expect("times regex")
});

static TEACHER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Docente:\s*([\w\s.\-]+)").expect("teacher regex"));

static CAPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Vagas Atualizadas da Turma.*?UERJ\s*(\d+)\s*(\d+).*?Vestibular\s*(\d+)\s*(\d+)")
        .expect("capacity regex")
});

static REQUESTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)Vagas para Solicitação de Inscrição.*?UERJ\s*(\d+)\s*(\d+)\s*(\d+).*?Vestibular\s*(\d+)\s*(\d+)\s*(\d+)",
    )
    .expect("requests regex")
});

/// Parses one normalized class block into a [`Class`]. Never fails.
pub fn parse_class(text: &str) -> Class {
    let mut class = Class {
        number: NUMBER_RE
            .captures(text)
            .map(|c| int_at(&c, 1))
            .unwrap_or(0),
        preferential: PREFERENTIAL_RE
            .captures(text)
            .map(|c| c[1].to_string()),
        times: TIMES_RE
            .captures(text)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty()),
        teacher: TEACHER_RE
            .captures(text)
            .map(|c| strip_vagas_suffix(&c[1]))
            .filter(|s| !s.is_empty()),
        ..Default::default()
    };

    if let Some(c) = CAPACITY_RE.captures(text) {
        class.offered_uerj = int_at(&c, 1);
        class.occupied_uerj = int_at(&c, 2);
        class.offered_vestibular = int_at(&c, 3);
        class.occupied_vestibular = int_at(&c, 4);
    }

    if let Some(c) = REQUESTS_RE.captures(text) {
        class.request_uerj_offered = int_at(&c, 1);
        class.request_uerj_total = int_at(&c, 2);
        class.request_uerj_preferential = int_at(&c, 3);
        class.request_vestibular_offered = int_at(&c, 4);
        class.request_vestibular_total = int_at(&c, 5);
        class.request_vestibular_preferential = int_at(&c, 6);
    }

    class
}

fn int_at(caps: &Captures<'_>, idx: usize) -> u32 {
    caps.get(idx)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

// The Docente pattern is greedy and runs on into the capacity block; cut it there.
fn strip_vagas_suffix(raw: &str) -> String {
    let trimmed = raw.trim();
    let cut = trimmed.find(" Vagas").map_or(trimmed, |i| &trimmed[..i]);
    cut.trim().to_string()
}
