//! Podcast highlight cards.

use scraper::{Html, Selector};

use curation_shared::{Chapter, ContentRecord};

use crate::{FragmentRenderer, escape_html};

/// Class on the element holding an episode title; archived pages are labelled by it.
const TITLE_CLASS: &str = "podcast-title";

/// Render the newest `limit` episodes, newest first by date.
///
/// Episodes without a date sort last; ties keep input order.
pub fn render_podcast_region(records: &[ContentRecord], limit: usize) -> String {
    let mut sorted: Vec<&ContentRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let cards: String = sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, record)| PodcastCard { index }.render(record))
        .collect();
    format!("{cards}\n            ")
}

/// Title of the first highlighted episode in a page or fragment.
pub fn highlighted_title(html: &str) -> Option<String> {
    let selector = Selector::parse(&format!(".{TITLE_CLASS}")).ok()?;
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// PodcastCard
// ---------------------------------------------------------------------------

/// Collapsible episode card with chapter breakdown.
#[derive(Debug, Clone, Copy)]
pub struct PodcastCard {
    pub index: usize,
}

impl FragmentRenderer for PodcastCard {
    fn render(&self, record: &ContentRecord) -> String {
        let title = non_empty(&record.title, "無標題");
        let summary = non_empty(&record.summary, "無摘要內容");
        let url = record.url.as_deref().unwrap_or("#");
        let date = record.date.as_deref().unwrap_or_default();
        let source_type = record
            .source_type
            .as_deref()
            .map(|s| format!(" | 素材來源：{}", escape_html(s)))
            .unwrap_or_default();
        let host = record.host.as_deref().unwrap_or("未知主持人");
        let guest = record.guest.as_deref().unwrap_or("未知來賓");

        format!(
            r#"
                <div class="news-card" style="border-top: 6px solid var(--podcast-accent); margin-bottom: 30px;">
                    <div class="title-cn">🎙️ <span class="{TITLE_CLASS}">{title}</span></div>
                    <div class="title-en" style="margin-bottom: 10px;">🗓️ 更新日期：{date}{source_type}</div>
                    <div class="expand-wrapper" id="pod-wrap-{index}">
                        <div class="summary-cn" style="border-left-color: var(--podcast-accent); padding-left: 15px; margin-bottom: 0;">
                            <p style="font-weight: 800; font-size: 1.1rem; color: var(--primary-text);">【核心主題】</p>
                            {summary}
                            <div class="podcast-chapters">{chapters}</div>
                            <hr style="margin-top: 30px; border: 0; border-top: 1px dashed #ccc;">
                            <p style="font-size: 0.9em; color: #666;">
                                <strong>主持人/來賓：</strong>{host} / {guest}<br>
                                <strong>原始連結：</strong><a href="{url}" target="_blank">{url}</a>
                            </p>
                        </div>
                        <div class="fade-mask"></div>
                    </div>
                    <div style="margin-top: 15px; display: flex; gap: 15px; align-items: center;">
                        <button class="toggle-btn" onclick="const wrapper = this.parentElement.previousElementSibling; wrapper.classList.toggle('expanded'); this.innerText = wrapper.classList.contains('expanded') ? '收起內容' : '展開全文 👀'">展開全文 👀</button>
                        <a href="{url}" target="_blank" style="color: var(--podcast-accent); text-decoration: none; font-weight: bold;"> 🎧 收聽來源 </a>
                    </div>
                </div>"#,
            title = escape_html(title),
            date = escape_html(date),
            index = self.index,
            chapters = render_chapters(&record.chapters),
            host = escape_html(host),
            guest = escape_html(guest),
            url = escape_html(url),
        )
    }
}

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() { default } else { value }
}

/// Chapter blocks, or nothing at all so the container stays empty.
fn render_chapters(chapters: &[Chapter]) -> String {
    if chapters.is_empty() {
        return String::new();
    }

    let mut html = String::new();
    for chapter in chapters {
        let heading = match chapter.timestamp.as_str() {
            "" => escape_html(non_empty(&chapter.title, "未命名章節")),
            ts => format!(
                "{} ({})",
                escape_html(non_empty(&chapter.title, "未命名章節")),
                escape_html(ts)
            ),
        };
        let quote = if chapter.quote.is_empty() {
            String::new()
        } else {
            format!(
                r#"
                                <blockquote style="font-style: italic; color: #6b7280; border-left: 4px solid var(--podcast-accent); padding: 15px; margin: 20px 0; background: rgba(139, 92, 246, 0.03);">「{}」</blockquote>"#,
                escape_html(&chapter.quote)
            )
        };
        html.push_str(&format!(
            r#"
                            <div class="podcast-chapter" style="margin-top: 25px;">
                                <h4 style="color: var(--podcast-accent); border-bottom: 1px solid rgba(139, 92, 246, 0.1); padding-bottom: 8px; font-size: 1.2rem;">{heading}</h4>
                                <p style="line-height: 1.8; color: #374151; font-size: 1.05rem;">{content}</p>{quote}
                            </div>"#,
            content = chapter.content,
        ));
    }
    html.push_str("\n                            ");
    html
}
