//! Table definitions for the content resources.
//!
//! Each impl owns the resource's validation: required fields, defaults, and
//! normalization of `visible`/`order`. Create and update share the same rules, as
//! updates replace the whole record.

use chrono::{NaiveTime, Utc};

use super::{ContentRepoState, FieldValue, Fields, Repositories, Resource};
use crate::{
    error::ApiError,
    models::{
        AdmissionStep, Course, CourseInput, Event, EventInput, FaqInput, FaqItem, News,
        NewsInput, Program, ProgramInput, Service, TitledInput, normalize_path_separators,
        optional_text, optional_timestamp, required_text, sort_order, visible_flag,
    },
};

fn text(value: Option<String>) -> FieldValue {
    FieldValue::Text(optional_text(value))
}

fn required(value: Option<&str>, field: &str) -> Result<FieldValue, ApiError> {
    required_text(value, field).map(|v| FieldValue::Text(Some(v)))
}

fn common(visible: Option<bool>, order: Option<i64>) -> [(&'static str, FieldValue); 2] {
    [
        ("visible", FieldValue::Flag(visible_flag(visible))),
        ("sort_order", FieldValue::Int(sort_order(order))),
    ]
}

impl Resource for News {
    type Input = NewsInput;

    const TABLE: &'static str = "news";
    const LABEL: &'static str = "News";
    const COLUMNS: &'static str = "id, title, summary, body, published_at, visible, sort_order, \
                                   created_by, created_at, updated_at";
    const TRACKS_AUTHOR: bool = true;
    const PUBLIC_LIMIT: i64 = 20;

    fn fields(input: NewsInput) -> Result<Fields, ApiError> {
        let published_at = optional_timestamp(input.published_at.as_deref(), "published_at")?
            .unwrap_or_else(Utc::now);

        let mut fields = vec![
            ("title", required(input.title.as_deref(), "title")?),
            ("summary", text(input.summary)),
            ("body", required(input.body.as_deref(), "body")?),
            ("published_at", FieldValue::Timestamp(Some(published_at))),
        ];
        fields.extend(common(input.visible, input.order));
        Ok(fields)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.news.clone()
    }
}

impl Resource for Event {
    type Input = EventInput;

    const TABLE: &'static str = "events";
    const LABEL: &'static str = "Event";
    const COLUMNS: &'static str = "id, title, description, starts_at, ends_at, location, visible, \
                                   sort_order, created_by, created_at, updated_at";
    const TRACKS_AUTHOR: bool = true;

    fn fields(input: EventInput) -> Result<Fields, ApiError> {
        // Events without a start default to 08:00 of the current day.
        let starts_at = optional_timestamp(input.starts_at.as_deref(), "starts_at")?
            .unwrap_or_else(|| {
                Utc::now()
                    .date_naive()
                    .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN))
                    .and_utc()
            });
        let ends_at = optional_timestamp(input.ends_at.as_deref(), "ends_at")?;

        let mut fields = vec![
            ("title", required(input.title.as_deref(), "title")?),
            ("description", text(input.description)),
            ("starts_at", FieldValue::Timestamp(Some(starts_at))),
            ("ends_at", FieldValue::Timestamp(ends_at)),
            ("location", text(input.location)),
        ];
        fields.extend(common(input.visible, input.order));
        Ok(fields)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.events.clone()
    }
}

impl Resource for Course {
    type Input = CourseInput;

    const TABLE: &'static str = "courses";
    const LABEL: &'static str = "Course";
    const COLUMNS: &'static str = "id, title, description, category, image_url, visible, \
                                   sort_order, created_by, created_at, updated_at";
    const CATEGORY_COLUMN: Option<&'static str> = Some("category");
    const TRACKS_AUTHOR: bool = true;

    fn fields(input: CourseInput) -> Result<Fields, ApiError> {
        let mut fields = vec![
            ("title", required(input.title.as_deref(), "title")?),
            ("description", text(input.description)),
            ("category", required(input.category.as_deref(), "category")?),
            (
                "image_url",
                FieldValue::Text(normalize_path_separators(optional_text(input.image_url))),
            ),
        ];
        fields.extend(common(input.visible, input.order));
        Ok(fields)
    }

    /// Older rows were written with Windows separators.
    fn present(mut self) -> Self {
        self.image_url = normalize_path_separators(self.image_url);
        self
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.courses.clone()
    }
}

impl Resource for Program {
    type Input = ProgramInput;

    const TABLE: &'static str = "programs";
    const LABEL: &'static str = "Program";
    const COLUMNS: &'static str = "id, name, summary, description, level, modality, duration, \
                                   shift, image_url, visible, sort_order, created_by, \
                                   created_at, updated_at";
    const TRACKS_AUTHOR: bool = true;
    const PUBLIC_LIMIT: i64 = 20;

    fn fields(input: ProgramInput) -> Result<Fields, ApiError> {
        let mut fields = vec![
            ("name", required(input.name.as_deref(), "name")?),
            ("summary", text(input.summary)),
            ("description", text(input.description)),
            ("level", text(input.level)),
            ("modality", text(input.modality)),
            ("duration", text(input.duration)),
            ("shift", text(input.shift)),
            (
                "image_url",
                FieldValue::Text(normalize_path_separators(optional_text(input.image_url))),
            ),
        ];
        fields.extend(common(input.visible, input.order));
        Ok(fields)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.programs.clone()
    }
}

fn titled_fields(input: TitledInput) -> Result<Fields, ApiError> {
    let mut fields = vec![
        ("title", required(input.title.as_deref(), "title")?),
        ("description", text(input.description)),
    ];
    fields.extend(common(input.visible, input.order));
    Ok(fields)
}

impl Resource for AdmissionStep {
    type Input = TitledInput;

    const TABLE: &'static str = "admission_steps";
    const LABEL: &'static str = "Admission step";
    const COLUMNS: &'static str =
        "id, title, description, visible, sort_order, created_at, updated_at";

    fn fields(input: TitledInput) -> Result<Fields, ApiError> {
        titled_fields(input)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.admissions.clone()
    }
}

impl Resource for Service {
    type Input = TitledInput;

    const TABLE: &'static str = "services";
    const LABEL: &'static str = "Service";
    const COLUMNS: &'static str =
        "id, title, description, visible, sort_order, created_at, updated_at";

    fn fields(input: TitledInput) -> Result<Fields, ApiError> {
        titled_fields(input)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.services.clone()
    }
}

impl Resource for FaqItem {
    type Input = FaqInput;

    const TABLE: &'static str = "faq_questions";
    const LABEL: &'static str = "FAQ item";
    const COLUMNS: &'static str = "id, question, short_answer, long_answer, visible, sort_order, \
                                   created_at, updated_at";

    fn fields(input: FaqInput) -> Result<Fields, ApiError> {
        let mut fields = vec![
            ("question", required(input.question.as_deref(), "question")?),
            ("short_answer", text(input.short_answer)),
            ("long_answer", text(input.long_answer)),
        ];
        fields.extend(common(input.visible, input.order));
        Ok(fields)
    }

    fn repository(repos: &Repositories) -> ContentRepoState<Self> {
        repos.faq.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(fields: &'a Fields, column: &str) -> &'a FieldValue {
        &fields.iter().find(|(c, _)| *c == column).unwrap().1
    }

    #[test]
    fn news_defaults_visible_and_order() {
        let fields = News::fields(NewsInput {
            title: Some("  Open day ".into()),
            body: Some("Doors open at nine".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(value(&fields, "title"), &FieldValue::Text(Some("Open day".into())));
        assert_eq!(value(&fields, "visible"), &FieldValue::Flag(1));
        assert_eq!(value(&fields, "sort_order"), &FieldValue::Int(0));
        assert!(matches!(value(&fields, "published_at"), FieldValue::Timestamp(Some(_))));
    }

    #[test]
    fn negative_order_is_clamped() {
        let fields = Service::fields(TitledInput {
            title: Some("Library".into()),
            visible: Some(false),
            order: Some(-4),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(value(&fields, "visible"), &FieldValue::Flag(0));
        assert_eq!(value(&fields, "sort_order"), &FieldValue::Int(0));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = Course::fields(CourseInput {
            title: Some("Robotics".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "category is required");
    }

    #[test]
    fn course_image_paths_use_forward_slashes() {
        let fields = Course::fields(CourseInput {
            title: Some("Robotics".into()),
            category: Some("tech".into()),
            image_url: Some(r"\uploads\courses\a.png".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            value(&fields, "image_url"),
            &FieldValue::Text(Some("/uploads/courses/a.png".into()))
        );
    }

    #[test]
    fn event_start_defaults_to_eight_am() {
        let fields = Event::fields(EventInput {
            title: Some("Fair".into()),
            ends_at: Some("not a date".into()),
            ..Default::default()
        });
        assert!(matches!(fields, Err(ApiError::Validation(_))));

        let fields = Event::fields(EventInput {
            title: Some("Fair".into()),
            ..Default::default()
        })
        .unwrap();
        match value(&fields, "starts_at") {
            FieldValue::Timestamp(Some(start)) => {
                assert_eq!(start.time(), NaiveTime::from_hms_opt(8, 0, 0).unwrap())
            }
            other => panic!("unexpected starts_at {other:?}"),
        }
    }
}
