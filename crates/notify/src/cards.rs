use serde::Serialize;

/// One queued notification, carried by the batcher until its card is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEvent {
    pub approval_id: String,
    pub document_type: String,
    pub object_name: String,
    pub schema_name: String,
    pub ticket: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardAction {
    pub label: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardSection {
    Heading { text: String },
    Facts { facts: Vec<CardFact> },
    Actions { actions: Vec<CardAction> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageCard {
    pub title: String,
    pub sections: Vec<CardSection>,
}

pub struct CardBuilder {
    title: String,
    sections: Vec<CardSection>,
}

impl CardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), sections: Vec::new() }
    }

    pub fn heading(mut self, text: impl Into<String>) -> Self {
        self.sections.push(CardSection::Heading { text: text.into() });
        self
    }

    pub fn facts<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut FactsBuilder),
    {
        let mut builder = FactsBuilder::default();
        build(&mut builder);
        self.sections.push(CardSection::Facts { facts: builder.build() });
        self
    }

    pub fn actions<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.sections.push(CardSection::Actions { actions: builder.build() });
        self
    }

    pub fn build(self) -> MessageCard {
        MessageCard { title: self.title, sections: self.sections }
    }
}

#[derive(Default)]
pub struct FactsBuilder {
    facts: Vec<CardFact>,
}

impl FactsBuilder {
    pub fn fact(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.facts.push(CardFact { name: name.into(), value: value.into() });
        self
    }

    fn build(self) -> Vec<CardFact> {
        self.facts
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    actions: Vec<CardAction>,
}

impl ActionsBuilder {
    pub fn link(&mut self, label: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.actions.push(CardAction { label: label.into(), url: url.into() });
        self
    }

    fn build(self) -> Vec<CardAction> {
        self.actions
    }
}

pub fn draft_ready_card(events: &[NotificationEvent], portal_base_url: &str) -> MessageCard {
    let title = if events.len() == 1 {
        "1 document ready for review".to_owned()
    } else {
        format!("{} documents ready for review", events.len())
    };
    render_events(title, "Review", events, portal_base_url)
}

pub fn defect_reminder_card(events: &[NotificationEvent], portal_base_url: &str) -> MessageCard {
    let title = if events.len() == 1 {
        "1 approval past its review deadline".to_owned()
    } else {
        format!("{} approvals past their review deadlines", events.len())
    };
    render_events(title, "Open approval", events, portal_base_url)
}

fn render_events(
    title: String,
    action_label: &str,
    events: &[NotificationEvent],
    portal_base_url: &str,
) -> MessageCard {
    let base = portal_base_url.trim_end_matches('/');
    let mut builder = CardBuilder::new(title.clone()).heading(title);

    for event in events {
        let approval_id = event.approval_id.clone();
        builder = builder
            .facts(|facts| {
                facts
                    .fact("Approval", &event.approval_id)
                    .fact("Document type", &event.document_type)
                    .fact("Object", format!("{}.{}", event.schema_name, event.object_name))
                    .fact("Ticket", &event.ticket)
                    .fact("Summary", &event.description);
            })
            .actions(|actions| {
                actions.link(action_label, format!("{base}/approvals/{approval_id}"));
            });
    }

    builder.build()
}
