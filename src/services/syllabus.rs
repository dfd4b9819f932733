// src/services/syllabus.rs

//! Syllabus page parsing.
//!
//! Section titles on the page are cells highlighted with `bgcolor="#DFEFFF"`;
//! each section's content is located relative to its title cell.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CourseDetail, CourseMeta, GradingPolicy, Methodology};
use crate::services::meta::saturating;

const ANCHOR_SELECTOR: &str = "[bgcolor='#DFEFFF']";
const MISSING_COURSE: &str = "無此課程！";

const HOURS: &str = "每週授課時數";
const DESCRIPTION: &str = "課程簡介";
const GOALS: &str = "課程目標";
const SYLLABUS: &str = "教學進度與主題";
const METHODOLOGIES: &str = "教學方法";
const GRADING: &str = "評量方法";
const REFERENCES: &str = "參考書目";

static GOAL_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\.　").expect("valid goal regex"));

/// Build a `CourseDetail` for `meta` from its syllabus page.
pub fn parse_syllabus(meta: &CourseMeta, html: &str) -> Result<CourseDetail> {
    if html.contains(MISSING_COURSE) {
        return Err(AppError::not_found(meta.label()));
    }

    let document = Html::parse_document(html);
    let selector = Selector::parse(ANCHOR_SELECTOR)
        .map_err(|e| AppError::selector(ANCHOR_SELECTOR, format!("{e:?}")))?;

    let anchors: HashMap<String, ElementRef> = document
        .select(&selector)
        .map(|el| (text_of(el), el))
        .collect();
    let anchor = |title: &str| anchors.get(title).copied();

    Ok(CourseDetail {
        meta: meta.clone(),
        hours: anchor(HOURS)
            .and_then(next_element)
            .map_or(0, |el| sum_numbers(&text_of(el))),
        description: anchor(DESCRIPTION)
            .and_then(next_element)
            .map(text_of)
            .unwrap_or_default(),
        goals: anchor(GOALS).map(goals).unwrap_or_default(),
        syllabus: anchor(SYLLABUS).map(syllabus).unwrap_or_default(),
        methodologies: anchor(METHODOLOGIES)
            .map(methodologies)
            .unwrap_or_default(),
        grading: anchor(GRADING).map(grading).unwrap_or_default(),
    })
}

/// Every row after the goals title row holds one goal in its first cell.
fn goals(title: ElementRef) -> Vec<String> {
    let Some(row) = parent_element(title) else {
        return Vec::new();
    };

    following_elements(row)
        .filter_map(|row| child_elements(row).next())
        .map(|cell| GOAL_NUMBERING.replace(&text_of(cell), "").into_owned())
        .collect()
}

/// First cell of the row after the title row, rendered as Markdown.
fn syllabus(title: ElementRef) -> String {
    parent_element(title)
        .and_then(next_element)
        .and_then(|row| child_elements(row).next())
        .map(|cell| html2md::parse_html(cell.inner_html().trim()).trim().to_string())
        .unwrap_or_default()
}

/// Rows between the column header and the grading title.
fn methodologies(title: ElementRef) -> Vec<Methodology> {
    let Some(row) = parent_element(title) else {
        return Vec::new();
    };

    following_elements(row)
        .skip(1)
        .take_while(|row| text_of(*row) != GRADING)
        .map(|row| {
            let cells: Vec<ElementRef> = child_elements(row).collect();
            Methodology {
                kind: cells.first().map(|c| text_of(*c)).unwrap_or_default(),
                note: cells.last().map(|c| text_of(*c)).unwrap_or_default(),
            }
        })
        .collect()
}

/// Rows between the column header and the references section.
fn grading(title: ElementRef) -> Vec<GradingPolicy> {
    let Some(row) = parent_element(title) else {
        return Vec::new();
    };

    following_elements(row)
        .skip(1)
        .take_while(|row| !text_of(*row).contains(REFERENCES))
        .map(|row| {
            let cells: Vec<ElementRef> = child_elements(row).collect();
            let weight: String = cells
                .get(1)
                .map(|c| text_of(*c))
                .unwrap_or_default()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();

            GradingPolicy {
                kind: cells.first().map(|c| text_of(*c)).unwrap_or_default(),
                weight: saturating(&weight),
                note: cells.last().map(|c| text_of(*c)).unwrap_or_default(),
            }
        })
        .collect()
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parent_element(el: ElementRef) -> Option<ElementRef> {
    el.parent().and_then(ElementRef::wrap)
}

fn next_element(el: ElementRef) -> Option<ElementRef> {
    el.next_siblings().find_map(ElementRef::wrap)
}

fn following_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.next_siblings().filter_map(ElementRef::wrap)
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Sum of every number in a string: `2 小時 + 1 小時` is 3.
fn sum_numbers(text: &str) -> u32 {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().unwrap_or(u32::MAX))
        .fold(0, u32::saturating_add)
}
