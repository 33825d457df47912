//! The daily news region: Techmeme, WSJ, and deep-analysis sections.

use chrono::NaiveDate;

use curation_shared::{ContentRecord, Headline, NewsDigest};

use crate::{FragmentRenderer, escape_html};

const DEFAULT_ANALYSIS_TITLE: &str = "Deep Analysis";

// ---------------------------------------------------------------------------
// Region composer
// ---------------------------------------------------------------------------

/// Render the full contents of the daily news region.
pub fn render_news_region(digest: &NewsDigest, date: NaiveDate) -> String {
    let techmeme = render_techmeme(&digest.techmeme, date);
    let wsj = render_wsj(&digest.wsj, date);
    let analysis = render_deep_analysis(digest.deep_analysis.values());
    format!("{techmeme}\n{wsj}\n{analysis}\n            ")
}

fn render_techmeme(items: &[Headline], date: NaiveDate) -> String {
    let mut html = format!(
        r#"
            <!-- Techmeme Section -->
            <div id="techmeme-section" class="section-header" style="color: var(--techmeme-accent);">
                <i class="fas fa-bolt"></i>
                <h2>Techmeme Top 10</h2>
                <p class="section-desc"><i class="far fa-calendar-alt"></i> {date}</p>
            </div>
            <div id="techmeme-grid" class="news-grid">"#
    );

    for item in items {
        let source = if item.source.is_empty() {
            "Read Story"
        } else {
            item.source.as_str()
        };
        html.push_str(&format!(
            r#"
                <div class="news-card" style="border-top: 6px solid var(--techmeme-accent);">
                    <div class="title-cn">{title_zh}</div>
                    <div class="title-en">{title_en}</div>
                    <a href="{url}" class="link-btn" style="color: var(--techmeme-accent);">{source} &rarr;</a>
                </div>"#,
            title_zh = escape_html(&item.title_zh),
            title_en = escape_html(&item.title_en),
            url = escape_html(&item.url),
            source = escape_html(source),
        ));
    }

    html.push_str("\n            </div>");
    html
}

fn render_wsj(items: &[Headline], date: NaiveDate) -> String {
    let mut html = format!(
        r#"
            <!-- WSJ Section -->
            <div id="wsj-section" class="section-header" style="color: var(--wsj-accent);">
                <i class="fas fa-newspaper"></i>
                <h2>WSJ Technology Top 10</h2>
                <p class="section-desc"><i class="far fa-calendar-alt"></i> {date}</p>
            </div>
            <div id="wsj-grid" class="news-grid">"#
    );

    for item in items {
        html.push_str(&format!(
            r#"
                <div class="news-card" style="border-top: 6px solid var(--wsj-accent);">
                    <div class="title-cn">{title_zh}</div>
                    <div class="title-en">{title_en}</div>
                    <div class="summary-cn">{summary_zh}</div>
                    <a href="{url}" class="link-btn" style="color: var(--wsj-accent);">WSJ &rarr;</a>
                </div>"#,
            title_zh = escape_html(&item.title_zh),
            title_en = escape_html(&item.title_en),
            summary_zh = escape_html(&item.summary_zh),
            url = escape_html(&item.url),
        ));
    }

    html.push_str("\n            </div>");
    html
}

fn render_deep_analysis<'a>(records: impl Iterator<Item = &'a ContentRecord>) -> String {
    let mut html = String::from(
        r#"
            <!-- Deep Analysis Section -->
            <div id="analysis-section" class="section-header" style="color: var(--analysis-accent);">
                <i class="fas fa-feather-alt"></i>
                <h2>Deep Analysis</h2>
                <p class="section-desc">Daily Intelligence</p>
            </div>
            <div id="deep-analysis-container">"#,
    );

    for (index, record) in records.enumerate() {
        html.push_str(&AnalysisCard { index }.render(record));
    }

    html.push_str("\n            </div>");
    html
}

// ---------------------------------------------------------------------------
// AnalysisCard
// ---------------------------------------------------------------------------

/// Collapsible deep-analysis card. `index` keeps toggle ids unique on the page.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisCard {
    pub index: usize,
}

impl AnalysisCard {
    fn toggle_id(&self) -> String {
        format!("analysis-toggle-{}", self.index)
    }
}

impl FragmentRenderer for AnalysisCard {
    fn render(&self, record: &ContentRecord) -> String {
        let title = if record.title.is_empty() {
            DEFAULT_ANALYSIS_TITLE
        } else {
            record.title.as_str()
        };
        let url = record.url.as_deref().unwrap_or("#");
        let toggle_id = self.toggle_id();

        format!(
            r#"
                <div class="news-card" style="border-top: 6px solid var(--analysis-accent); margin-bottom: 40px;">
                    <h3 style="font-size: 1.6rem; font-weight: bold; margin-top: 0;">{title}</h3>
                    <a href="{url}" style="color: var(--analysis-accent); font-weight: bold; text-decoration: none;">Original Source Link &rarr;</a>
                    <div class="expand-wrapper" id="{toggle_id}">
                        <div class="analysis-content" style="margin-top: 20px; line-height: 1.8;">
                            {summary}{insights}
                        </div>
                        <div class="fade-mask"></div>
                    </div>
                    <button class="toggle-btn" onclick="toggleAnalysis('{toggle_id}')">展開全文 👀</button>
                </div>"#,
            title = escape_html(title),
            url = escape_html(url),
            summary = record.summary,
            insights = render_insights(record),
        )
    }
}

fn render_insights(record: &ContentRecord) -> String {
    if record.insights.is_empty() {
        return String::new();
    }

    let mut html = String::from("<br><br><strong>關鍵洞察：</strong><br>");
    for (i, insight) in record.insights.iter().enumerate() {
        let n = i + 1;
        let text = escape_html(&insight.content);
        match insight.topic.as_deref() {
            Some(topic) => {
                html.push_str(&format!(
                    "{n}. <strong>{}：</strong> {text}<br>",
                    escape_html(topic)
                ));
            }
            None => html.push_str(&format!("{n}. {text}<br>")),
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_shared::Insight;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn digest() -> NewsDigest {
        let mut digest = NewsDigest::default();
        digest.techmeme.push(Headline {
            title_en: "Chip rules tighten".into(),
            title_zh: "晶片規定收緊".into(),
            url: "https://t.example/1?a=1&b=2".into(),
            ..Default::default()
        });
        digest.wsj.push(Headline {
            title_en: "AI spending".into(),
            title_zh: "AI 支出".into(),
            summary_zh: "資本支出創新高".into(),
            url: "https://w.example/2".into(),
            ..Default::default()
        });
        digest.deep_analysis.insert(
            "Stratechery".into(),
            ContentRecord {
                title: "聚合者的兩難".into(),
                summary: "<p>第一段</p>".into(),
                url: Some("https://stratechery.com/x".into()),
                insights: vec![
                    Insight { topic: Some("需求".into()), content: "掌握使用者".into() },
                    Insight { topic: None, content: "A < B".into() },
                ],
                ..Default::default()
            },
        );
        digest
    }

    #[test]
    fn region_has_three_sections_in_order() {
        let html = render_news_region(&digest(), date());
        let techmeme = html.find("techmeme-section").unwrap();
        let wsj = html.find("wsj-section").unwrap();
        let analysis = html.find("analysis-section").unwrap();
        assert!(techmeme < wsj && wsj < analysis);
        assert!(html.contains("</i> 2026-10-18</p>"));
        assert!(html.ends_with("</div>\n            "));
    }

    #[test]
    fn headlines_escape_text_and_urls() {
        let html = render_news_region(&digest(), date());
        assert!(html.contains(r#"href="https://t.example/1?a=1&amp;b=2""#));
        assert!(html.contains("Read Story &rarr;"));
        assert!(html.contains(r#"<div class="summary-cn">資本支出創新高</div>"#));
    }

    #[test]
    fn analysis_card_keeps_summary_markup() {
        let html = render_news_region(&digest(), date());
        assert!(html.contains("<p>第一段</p><br><br><strong>關鍵洞察：</strong><br>"));
        assert!(html.contains("1. <strong>需求：</strong> 掌握使用者<br>"));
        assert!(html.contains("2. A &lt; B<br>"));
        assert!(html.contains(r#"onclick="toggleAnalysis('analysis-toggle-0')""#));
    }

    #[test]
    fn card_defaults() {
        let html = AnalysisCard { index: 3 }.render(&ContentRecord::default());
        assert!(html.contains(">Deep Analysis</h3>"));
        assert!(html.contains(r##"href="#""##));
        assert!(html.contains(r#"id="analysis-toggle-3""#));
        assert!(!html.contains("關鍵洞察"));
    }

    #[test]
    fn empty_digest_renders_empty_sections() {
        let html = render_news_region(&NewsDigest::default(), date());
        assert!(html.contains(r#"<div id="techmeme-grid" class="news-grid">"#));
        assert!(!html.contains("news-card"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(
            render_news_region(&digest(), date()),
            render_news_region(&digest(), date())
        );
    }
}
