// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Area, Command, EditOp, Input, InvocationEvent, InvocationId, InvocationPhase, Message,
    MethodMetadata, NavEpoch, STATUS_OK, StatusLine, StatusUpdate, TextBuffer, View, format_json,
    short_method_name,
};

pub const STATUS_BAR_HEIGHT: u16 = 1;
pub const TITLE_HEIGHT: u16 = 2;
pub const HELP_HEIGHT: u16 = 1;
/// Border rows around the schema panel on the request screen.
const SCHEMA_CHROME_HEIGHT: u16 = 2;

/// Uniform contract every screen implements; the session picks one by [`View`].
pub trait Screen {
    fn handle(&mut self, message: &Message) -> Vec<Command>;
    fn resize(&mut self, area: Area);
    fn area(&self) -> Area;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub name: String,
    pub label: String,
}

/// A scrollable list that can be narrowed by a case-insensitive substring of the labels.
///
/// `cursor` indexes the visible (filtered) items, never `items` directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListState {
    pub title: String,
    pub items: Vec<ListItem>,
    pub cursor: usize,
    pub filter: Option<String>,
    pub area: Area,
    matches: Vec<usize>,
}

impl ListState {
    fn with_title(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            ..Self::default()
        }
    }

    pub fn selected(&self) -> Option<&ListItem> {
        self.matches
            .get(self.cursor)
            .and_then(|&index| self.items.get(index))
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &ListItem> {
        self.matches.iter().filter_map(|&index| self.items.get(index))
    }

    pub fn visible_len(&self) -> usize {
        self.matches.len()
    }

    pub const fn is_filtering(&self) -> bool {
        self.filter.is_some()
    }

    pub fn page_rows(&self) -> usize {
        usize::from(self.area.height.saturating_sub(TITLE_HEIGHT + HELP_HEIGHT)).max(1)
    }

    fn set_items(&mut self, items: Vec<ListItem>) {
        self.items = items;
        self.filter = None;
        self.cursor = 0;
        self.refilter();
    }

    /// Drops the filter; returns whether one was active.
    fn clear_filter(&mut self) -> bool {
        if self.filter.take().is_none() {
            return false;
        }
        let selected = self.matches.get(self.cursor).copied();
        self.refilter();
        self.cursor = selected.unwrap_or(0);
        true
    }

    fn refilter(&mut self) {
        let needle = self.filter.as_deref().unwrap_or_default().to_lowercase();
        self.matches = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.label.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
        self.cursor = self.cursor.min(self.matches.len().saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.matches.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.matches.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    fn edit_filter(&mut self, op: EditOp) -> bool {
        let Some(filter) = self.filter.as_mut() else {
            return false;
        };
        match op {
            EditOp::Insert(ch) => filter.push(ch),
            EditOp::Backspace => {
                filter.pop();
            }
            _ => return false,
        }
        self.cursor = 0;
        self.refilter();
        true
    }

    fn navigate(&mut self, input: Input) -> bool {
        let page = isize::try_from(self.page_rows()).unwrap_or(isize::MAX);
        match input {
            Input::Up => self.move_cursor(-1),
            Input::Down => self.move_cursor(1),
            Input::PageUp => self.move_cursor(-page),
            Input::PageDown => self.move_cursor(page),
            Input::First => self.cursor = 0,
            Input::Last => self.cursor = self.matches.len().saturating_sub(1),
            Input::Filter => {
                if self.filter.is_none() {
                    self.filter = Some(String::new());
                }
            }
            Input::Edit(op) => return self.edit_filter(op),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesScreen {
    pub list: ListState,
    epoch: NavEpoch,
}

impl ServicesScreen {
    fn new() -> Self {
        Self {
            list: ListState::with_title("Services"),
            epoch: NavEpoch::default(),
        }
    }
}

impl Screen for ServicesScreen {
    fn handle(&mut self, message: &Message) -> Vec<Command> {
        match message {
            Message::Input(Input::Select) => match self.list.selected() {
                Some(item) => vec![Command::LoadMethods {
                    epoch: self.epoch,
                    service: item.name.clone(),
                }],
                None => Vec::new(),
            },
            Message::Input(input) => {
                self.list.navigate(*input);
                Vec::new()
            }
            Message::ServicesLoaded { epoch, names } => {
                self.epoch = *epoch;
                self.list.set_items(
                    names
                        .iter()
                        .map(|name| ListItem {
                            name: name.clone(),
                            label: name.clone(),
                        })
                        .collect(),
                );
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn resize(&mut self, area: Area) {
        self.list.area = area;
    }

    fn area(&self) -> Area {
        self.list.area
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodsScreen {
    pub service: Option<String>,
    pub list: ListState,
    epoch: NavEpoch,
}

impl MethodsScreen {
    fn new() -> Self {
        Self {
            service: None,
            list: ListState::with_title("Methods"),
            epoch: NavEpoch::default(),
        }
    }
}

impl Screen for MethodsScreen {
    fn handle(&mut self, message: &Message) -> Vec<Command> {
        match message {
            Message::Input(Input::Select) => match self.list.selected() {
                Some(item) => vec![Command::LoadMethodMetadata {
                    epoch: self.epoch,
                    method: item.name.clone(),
                }],
                None => Vec::new(),
            },
            Message::Input(input) => {
                self.list.navigate(*input);
                Vec::new()
            }
            Message::MethodsLoaded {
                epoch,
                service,
                names,
            } => {
                self.epoch = *epoch;
                self.service = Some(service.clone());
                self.list.title = format!("Methods of {service}");
                self.list.set_items(
                    names
                        .iter()
                        .map(|name| ListItem {
                            name: name.clone(),
                            label: short_method_name(name).to_owned(),
                        })
                        .collect(),
                );
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn resize(&mut self, area: Area) {
        self.list.area = area;
    }

    fn area(&self) -> Area {
        self.list.area
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestScreen {
    pub method: Option<String>,
    pub schema_text: String,
    pub editor: TextBuffer,
    pub show_schema: bool,
    pub area: Area,
}

impl RequestScreen {
    pub fn editor_height(&self) -> u16 {
        let mut reserved = HELP_HEIGHT;
        if self.show_schema {
            reserved = reserved
                .saturating_add(self.schema_height())
                .saturating_add(SCHEMA_CHROME_HEIGHT);
        }
        self.area.height.saturating_sub(reserved)
    }

    pub fn schema_height(&self) -> u16 {
        u16::try_from(self.schema_text.lines().count()).unwrap_or(u16::MAX)
    }

    fn load(&mut self, metadata: &MethodMetadata) {
        self.method = Some(metadata.method.clone());
        self.schema_text.clone_from(&metadata.schema_text);
        if self.schema_text.trim().is_empty() {
            self.show_schema = false;
        }
        let payload = metadata
            .saved_payload
            .as_deref()
            .unwrap_or(&metadata.example_json);
        self.editor.set_text(payload);
        if self.editor.lines().len() > 1 {
            self.editor.set_cursor(1, usize::MAX);
        } else {
            self.editor.set_cursor(0, 1);
        }
    }
}

impl Screen for RequestScreen {
    fn handle(&mut self, message: &Message) -> Vec<Command> {
        match message {
            Message::Input(Input::Send) => match &self.method {
                Some(method) => vec![Command::SendRequest {
                    method: method.clone(),
                    payload: self.editor.text(),
                }],
                None => vec![Command::Status(StatusUpdate::error_message(
                    "no method selected",
                ))],
            },
            Message::Input(Input::Format) => {
                if let Some(formatted) = format_json(&self.editor.text()) {
                    let (row, col) = self.editor.cursor();
                    self.editor.set_text(&formatted);
                    self.editor.set_cursor(row, col);
                }
                Vec::new()
            }
            Message::Input(Input::ToggleDescription) => {
                if !self.schema_text.trim().is_empty() {
                    self.show_schema = !self.show_schema;
                }
                Vec::new()
            }
            Message::Input(Input::Edit(op)) => {
                self.editor.apply(*op);
                Vec::new()
            }
            Message::Input(Input::Up) => {
                self.editor.apply(EditOp::Up);
                Vec::new()
            }
            Message::Input(Input::Down) => {
                self.editor.apply(EditOp::Down);
                Vec::new()
            }
            Message::MethodMetadataLoaded { metadata, .. } => {
                self.load(metadata);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn resize(&mut self, area: Area) {
        self.area = area;
    }

    fn area(&self) -> Area {
        self.area
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseScreen {
    pub method: Option<String>,
    pub chunks: Vec<String>,
    pub phase: InvocationPhase,
    pub scroll: u16,
    pub area: Area,
}

impl ResponseScreen {
    pub fn body(&self) -> String {
        self.chunks.join("\n")
    }

    pub fn body_height(&self) -> u16 {
        self.area
            .height
            .saturating_sub(TITLE_HEIGHT.saturating_add(HELP_HEIGHT))
    }

    pub fn title(&self) -> String {
        let method = self.method.as_deref().map(short_method_name).unwrap_or("");
        match self.phase {
            InvocationPhase::Idle => "Response".to_owned(),
            _ if method.is_empty() => format!("Response · {}", self.phase.label()),
            _ => format!("Response · {method} · {}", self.phase.label()),
        }
    }

    fn max_scroll(&self) -> u16 {
        let lines: usize = self.chunks.iter().map(|chunk| chunk.lines().count()).sum();
        u16::try_from(lines)
            .unwrap_or(u16::MAX)
            .saturating_sub(self.body_height())
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll).saturating_add(delta);
        let clamped = next.clamp(0, i32::from(self.max_scroll()));
        self.scroll = u16::try_from(clamped).unwrap_or(0);
    }

    fn reset(&mut self) {
        self.chunks.clear();
        self.scroll = 0;
        self.phase = InvocationPhase::Idle;
    }

    fn apply_event(&mut self, invocation: InvocationId, event: &InvocationEvent) -> Vec<Command> {
        self.phase = self.phase.advance(event);
        match event {
            InvocationEvent::ResponseReceived { payload } => {
                self.chunks.push(payload.clone());
                vec![Command::AwaitInvocationEvent(invocation)]
            }
            InvocationEvent::TrailersReceived { status } if status == STATUS_OK => {
                vec![Command::Status(StatusUpdate::success_message(status.clone()))]
            }
            InvocationEvent::TrailersReceived { status } => {
                vec![Command::Status(StatusUpdate::error_message(status.clone()))]
            }
            InvocationEvent::Error { cause } => {
                vec![Command::Status(StatusUpdate::error_message(cause.clone()))]
            }
            InvocationEvent::MethodResolved
            | InvocationEvent::HeadersSent
            | InvocationEvent::HeadersReceived => {
                vec![Command::AwaitInvocationEvent(invocation)]
            }
        }
    }
}

impl Screen for ResponseScreen {
    fn handle(&mut self, message: &Message) -> Vec<Command> {
        let page = i32::from(self.body_height().max(1));
        match message {
            Message::InvocationStarted { invocation, method } => {
                self.reset();
                self.method = Some(method.clone());
                self.phase = InvocationPhase::Resolving;
                vec![
                    Command::Status(StatusUpdate::ClearMessage),
                    Command::AwaitInvocationEvent(*invocation),
                ]
            }
            Message::Invocation { invocation, event } => self.apply_event(*invocation, event),
            Message::Input(Input::Back) => {
                if !self.phase.is_terminal() {
                    self.phase = InvocationPhase::Cancelled;
                }
                self.chunks.clear();
                self.scroll = 0;
                vec![
                    Command::Status(StatusUpdate::ClearMessage),
                    Command::Status(StatusUpdate::ready()),
                ]
            }
            Message::Input(Input::Up) => {
                self.scroll_by(-1);
                Vec::new()
            }
            Message::Input(Input::Down) => {
                self.scroll_by(1);
                Vec::new()
            }
            Message::Input(Input::PageUp) => {
                self.scroll_by(-page);
                Vec::new()
            }
            Message::Input(Input::PageDown) => {
                self.scroll_by(page);
                Vec::new()
            }
            Message::Input(Input::First) => {
                self.scroll = 0;
                Vec::new()
            }
            Message::Input(Input::Last) => {
                self.scroll = self.max_scroll();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn resize(&mut self, area: Area) {
        self.area = area;
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn area(&self) -> Area {
        self.area
    }
}

/// Root of the interactive session: the active view, every screen, and the status line.
///
/// Owned by the UI loop and mutated only through [`Session::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    view: View,
    locked_method: Option<String>,
    epoch: NavEpoch,
    invocation: Option<InvocationId>,
    pub services: ServicesScreen,
    pub methods: MethodsScreen,
    pub request: RequestScreen,
    pub response: ResponseScreen,
    pub status: StatusLine,
}

impl Session {
    pub fn new(locked_method: Option<String>) -> Self {
        let locked_method = locked_method.filter(|method| !method.trim().is_empty());
        let view = if locked_method.is_some() {
            View::RequestEditor
        } else {
            View::ServicesList
        };
        Self {
            view,
            locked_method,
            epoch: NavEpoch::default(),
            invocation: None,
            services: ServicesScreen::new(),
            methods: MethodsScreen::new(),
            request: RequestScreen::default(),
            response: ResponseScreen::default(),
            status: StatusLine::default(),
        }
    }

    /// Commands to issue before the first message is handled.
    pub fn init(&self) -> Vec<Command> {
        match &self.locked_method {
            Some(method) => vec![Command::LoadMethodMetadata {
                epoch: self.epoch,
                method: method.clone(),
            }],
            None => vec![Command::LoadServices { epoch: self.epoch }],
        }
    }

    pub const fn view(&self) -> View {
        self.view
    }

    pub fn locked_method(&self) -> Option<&str> {
        self.locked_method.as_deref()
    }

    pub const fn active_invocation(&self) -> Option<InvocationId> {
        self.invocation
    }

    pub fn screen(&self, view: View) -> &dyn Screen {
        match view {
            View::ServicesList => &self.services,
            View::MethodsList => &self.methods,
            View::RequestEditor => &self.request,
            View::ResponseViewer => &self.response,
        }
    }

    fn screen_mut(&mut self, view: View) -> &mut dyn Screen {
        match view {
            View::ServicesList => &mut self.services,
            View::MethodsList => &mut self.methods,
            View::RequestEditor => &mut self.request,
            View::ResponseViewer => &mut self.response,
        }
    }

    /// Applies one message and returns the commands it produced.
    pub fn handle(&mut self, message: Message) -> Vec<Command> {
        let mut commands = Vec::new();
        match &message {
            Message::Status(update) => {
                self.status.apply(update);
                return commands;
            }
            Message::Resize(area) => {
                self.resize(*area);
                return commands;
            }
            Message::Input(Input::ForceQuit) => return vec![Command::Quit],
            Message::Input(Input::Back) => return self.back(),
            Message::Input(Input::Resend) => {
                if self.view != View::ResponseViewer {
                    return commands;
                }
                self.invocation = None;
                self.view = View::RequestEditor;
                return vec![Command::Status(StatusUpdate::ClearMessage), Command::Resend];
            }
            Message::ServicesLoaded { epoch, .. } => {
                if !self.accepts(*epoch, "services") {
                    return commands;
                }
                self.view = View::ServicesList;
            }
            Message::MethodsLoaded { epoch, .. } => {
                if !self.accepts(*epoch, "methods") {
                    return commands;
                }
                self.view = View::MethodsList;
            }
            Message::MethodMetadataLoaded { epoch, .. } => {
                if !self.accepts(*epoch, "method metadata") {
                    return commands;
                }
                self.view = View::RequestEditor;
            }
            Message::InvocationStarted { invocation, .. } => {
                self.invocation = Some(*invocation);
                self.view = View::ResponseViewer;
            }
            Message::Invocation { invocation, event } => {
                if self.invocation != Some(*invocation) {
                    tracing::debug!(%invocation, event = event.label(), "dropping stale event");
                    return commands;
                }
                if event.is_terminal() {
                    self.invocation = None;
                }
                return self.response.handle(&message);
            }
            Message::Err { cause } => {
                commands.push(Command::Status(StatusUpdate::error_message(cause.clone())));
            }
            Message::Input(_) => {}
        }
        commands.extend(self.screen_mut(self.view).handle(&message));
        commands
    }

    fn accepts(&self, epoch: NavEpoch, what: &str) -> bool {
        if epoch == self.epoch {
            return true;
        }
        tracing::debug!(%epoch, current = %self.epoch, "dropping stale {what} result");
        false
    }

    /// Whether the focused list is taking typed filter text.
    pub fn filtering(&self) -> bool {
        match self.view {
            View::ServicesList => self.services.list.is_filtering(),
            View::MethodsList => self.methods.list.is_filtering(),
            View::RequestEditor | View::ResponseViewer => false,
        }
    }

    fn back(&mut self) -> Vec<Command> {
        let cleared = match self.view {
            View::ServicesList => self.services.list.clear_filter(),
            View::MethodsList => self.methods.list.clear_filter(),
            View::RequestEditor | View::ResponseViewer => false,
        };
        if cleared {
            return Vec::new();
        }

        let mut commands = vec![Command::CancelInFlight];
        self.invocation = None;
        self.epoch = self.epoch.next();
        commands.extend(self.screen_mut(self.view).handle(&Message::Input(Input::Back)));

        match self.view {
            View::ServicesList => commands.push(Command::Quit),
            View::MethodsList => self.view = View::ServicesList,
            View::RequestEditor if self.locked_method.is_some() => commands.push(Command::Quit),
            View::RequestEditor => self.view = View::MethodsList,
            View::ResponseViewer => self.view = View::RequestEditor,
        }
        self.sync_epochs();
        commands
    }

    fn sync_epochs(&mut self) {
        self.services.epoch = self.epoch;
        self.methods.epoch = self.epoch;
    }

    fn resize(&mut self, area: Area) {
        let status_rows = STATUS_BAR_HEIGHT.min(area.height);
        let screen_area = Area::new(area.width, area.height.saturating_sub(status_rows));
        for view in View::ALL {
            self.screen_mut(view).resize(screen_area);
        }
        self.status.resize(Area::new(area.width, status_rows));
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::{
        Area, Command, EditOp, Input, InvocationEvent, InvocationId, Message, MessageKind,
        MethodMetadata, NavEpoch, StatusUpdate, View,
    };

    fn input(session: &mut Session, input: Input) -> Vec<Command> {
        session.handle(Message::Input(input))
    }

    fn metadata(method: &str) -> MethodMetadata {
        MethodMetadata {
            method: method.to_owned(),
            schema_text: "message Req {\n  string name = 1;\n}".to_owned(),
            example_json: "{\n  \"name\": \"\"\n}".to_owned(),
            saved_payload: None,
        }
    }

    /// Drives a fresh session to the response screen with invocation 1 active.
    fn session_on_response() -> Session {
        let mut session = Session::new(None);
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: vec!["pkg.Svc".to_owned()],
        });
        session.handle(Message::MethodsLoaded {
            epoch: NavEpoch::default(),
            service: "pkg.Svc".to_owned(),
            names: vec!["pkg.Svc.Method".to_owned()],
        });
        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("pkg.Svc.Method"),
        });
        session.handle(Message::InvocationStarted {
            invocation: InvocationId::new(1),
            method: "pkg.Svc.Method".to_owned(),
        });
        session
    }

    #[test]
    fn starts_on_services_and_loads_them() {
        let session = Session::new(None);
        assert_eq!(session.view(), View::ServicesList);
        assert_eq!(
            session.init(),
            vec![Command::LoadServices {
                epoch: NavEpoch::default()
            }]
        );
    }

    #[test]
    fn locked_method_starts_on_request_editor() {
        let session = Session::new(Some("pkg.Svc/Method".to_owned()));
        assert_eq!(session.view(), View::RequestEditor);
        assert_eq!(
            session.init(),
            vec![Command::LoadMethodMetadata {
                epoch: NavEpoch::default(),
                method: "pkg.Svc/Method".to_owned(),
            }]
        );
    }

    #[test]
    fn selecting_a_service_loads_its_methods() {
        let mut session = Session::new(None);
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: vec!["A".to_owned(), "B".to_owned()],
        });

        let commands = input(&mut session, Input::Select);
        assert_eq!(
            commands,
            vec![Command::LoadMethods {
                epoch: NavEpoch::default(),
                service: "A".to_owned(),
            }]
        );

        session.handle(Message::MethodsLoaded {
            epoch: NavEpoch::default(),
            service: "A".to_owned(),
            names: vec!["A.Ping".to_owned()],
        });
        assert_eq!(session.view(), View::MethodsList);
        assert!(session.methods.list.title.contains('A'));
        assert_eq!(session.methods.list.items[0].label, "Ping");
    }

    #[test]
    fn cursor_moves_within_list_bounds() {
        let mut session = Session::new(None);
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: vec!["A".to_owned(), "B".to_owned()],
        });
        input(&mut session, Input::Down);
        input(&mut session, Input::Down);
        assert_eq!(session.services.list.cursor, 1);
        input(&mut session, Input::First);
        assert_eq!(session.services.list.cursor, 0);

        let commands = input(&mut session, Input::Last);
        assert!(commands.is_empty());
        assert_eq!(
            input(&mut session, Input::Select),
            vec![Command::LoadMethods {
                epoch: NavEpoch::default(),
                service: "B".to_owned(),
            }]
        );
    }

    #[test]
    fn select_on_empty_list_does_nothing() {
        let mut session = Session::new(None);
        assert!(input(&mut session, Input::Select).is_empty());
    }

    fn type_filter(session: &mut Session, text: &str) {
        input(session, Input::Filter);
        for ch in text.chars() {
            input(session, Input::Edit(EditOp::Insert(ch)));
        }
    }

    fn loaded_services(names: &[&str]) -> Session {
        let mut session = Session::new(None);
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: names.iter().map(|name| (*name).to_owned()).collect(),
        });
        session
    }

    #[test]
    fn filter_narrows_list_and_selects_match() {
        let mut session = loaded_services(&["pkg.Alpha", "pkg.Beta", "other.Gamma", "pkg.Delta"]);
        type_filter(&mut session, "PKG.");
        assert!(session.filtering());
        assert_eq!(session.services.list.visible_len(), 3);

        input(&mut session, Input::Last);
        assert_eq!(
            session.services.list.selected().map(|item| item.name.as_str()),
            Some("pkg.Delta")
        );

        input(&mut session, Input::Edit(EditOp::Insert('b')));
        let visible: Vec<_> = session
            .services
            .list
            .visible_items()
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(visible, vec!["pkg.Beta"]);
        assert_eq!(
            input(&mut session, Input::Select),
            vec![Command::LoadMethods {
                epoch: NavEpoch::default(),
                service: "pkg.Beta".to_owned(),
            }]
        );
    }

    #[test]
    fn filter_without_matches_selects_nothing() {
        let mut session = loaded_services(&["A", "B"]);
        type_filter(&mut session, "zz");
        assert_eq!(session.services.list.visible_len(), 0);
        assert!(input(&mut session, Input::Select).is_empty());

        input(&mut session, Input::Edit(EditOp::Backspace));
        input(&mut session, Input::Edit(EditOp::Backspace));
        assert_eq!(session.services.list.visible_len(), 2);
    }

    #[test]
    fn back_clears_filter_before_leaving() {
        let mut session = loaded_services(&["A", "B", "C"]);
        type_filter(&mut session, "c");
        assert_eq!(session.services.list.visible_len(), 1);

        assert!(input(&mut session, Input::Back).is_empty());
        assert!(!session.filtering());
        assert_eq!(session.view(), View::ServicesList);
        assert_eq!(session.services.list.visible_len(), 3);
        assert_eq!(
            session.services.list.selected().map(|item| item.name.as_str()),
            Some("C")
        );

        assert!(input(&mut session, Input::Back).contains(&Command::Quit));
    }

    #[test]
    fn new_items_reset_filter() {
        let mut session = loaded_services(&["A", "B"]);
        type_filter(&mut session, "b");
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: vec!["X".to_owned(), "Y".to_owned()],
        });
        assert!(!session.filtering());
        assert_eq!(session.services.list.visible_len(), 2);
        assert_eq!(session.services.list.cursor, 0);
    }

    #[test]
    fn edits_outside_filter_mode_are_ignored_by_lists() {
        let mut session = loaded_services(&["A", "B"]);
        assert!(input(&mut session, Input::Edit(EditOp::Insert('b'))).is_empty());
        assert!(!session.filtering());
        assert_eq!(session.services.list.visible_len(), 2);
    }

    #[test]
    fn force_quit_ends_session_from_every_view() {
        let mut services = Session::new(None);
        let mut methods = Session::new(None);
        methods.handle(Message::MethodsLoaded {
            epoch: NavEpoch::default(),
            service: "A".to_owned(),
            names: Vec::new(),
        });
        let mut request = Session::new(Some("pkg.Svc/Method".to_owned()));
        let mut response = session_on_response();

        for session in [&mut services, &mut methods, &mut request, &mut response] {
            assert_eq!(input(session, Input::ForceQuit), vec![Command::Quit]);
        }
        assert_eq!(methods.view(), View::MethodsList);
        assert_eq!(response.view(), View::ResponseViewer);
    }

    #[test]
    fn back_from_services_quits() {
        let mut session = Session::new(None);
        let commands = input(&mut session, Input::Back);
        assert!(commands.contains(&Command::Quit));
        assert_eq!(commands.first(), Some(&Command::CancelInFlight));
    }

    #[test]
    fn back_walks_the_navigation_stack() {
        let mut session = session_on_response();

        let commands = input(&mut session, Input::Back);
        assert_eq!(commands.first(), Some(&Command::CancelInFlight));
        assert!(!commands.contains(&Command::Quit));
        assert_eq!(session.view(), View::RequestEditor);
        assert_eq!(session.active_invocation(), None);

        input(&mut session, Input::Back);
        assert_eq!(session.view(), View::MethodsList);
        input(&mut session, Input::Back);
        assert_eq!(session.view(), View::ServicesList);
        assert!(input(&mut session, Input::Back).contains(&Command::Quit));
    }

    #[test]
    fn back_from_request_quits_only_with_locked_method() {
        let mut locked = Session::new(Some("pkg.Svc/Method".to_owned()));
        assert!(input(&mut locked, Input::Back).contains(&Command::Quit));

        let mut browsing = session_on_response();
        input(&mut browsing, Input::Back);
        assert_eq!(browsing.view(), View::RequestEditor);
        assert!(!input(&mut browsing, Input::Back).contains(&Command::Quit));
        assert_eq!(browsing.view(), View::MethodsList);
    }

    #[test]
    fn stale_discovery_result_does_not_resurrect_a_left_screen() {
        let mut session = Session::new(None);
        session.handle(Message::ServicesLoaded {
            epoch: NavEpoch::default(),
            names: vec!["A".to_owned()],
        });
        session.handle(Message::MethodsLoaded {
            epoch: NavEpoch::default(),
            service: "A".to_owned(),
            names: vec!["A.Ping".to_owned()],
        });
        input(&mut session, Input::Select);
        input(&mut session, Input::Back);
        assert_eq!(session.view(), View::ServicesList);

        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("A.Ping"),
        });
        assert_eq!(session.view(), View::ServicesList);
        assert_eq!(session.request.method, None);
    }

    #[test]
    fn discovery_results_switch_view_regardless_of_origin() {
        let mut session = Session::new(None);
        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("pkg.Svc.Method"),
        });
        assert_eq!(session.view(), View::RequestEditor);
        assert_eq!(session.request.method.as_deref(), Some("pkg.Svc.Method"));
        assert!(session.request.editor.text().contains("\"name\""));
    }

    #[test]
    fn saved_payload_wins_over_template() {
        let mut session = Session::new(None);
        let mut loaded = metadata("pkg.Svc.Method");
        loaded.saved_payload = Some(r#"{"name":"saved"}"#.to_owned());
        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: loaded,
        });
        assert_eq!(session.request.editor.text(), r#"{"name":"saved"}"#);
    }

    #[test]
    fn send_submits_editor_text_for_loaded_method() {
        let mut session = Session::new(Some("pkg.Svc/Method".to_owned()));
        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("pkg.Svc/Method"),
        });
        session.request.editor.set_text("{}");

        assert_eq!(
            input(&mut session, Input::Send),
            vec![Command::SendRequest {
                method: "pkg.Svc/Method".to_owned(),
                payload: "{}".to_owned(),
            }]
        );
        assert_eq!(session.view(), View::RequestEditor);
    }

    #[test]
    fn editing_and_format_rewrite_the_payload() {
        let mut session = Session::new(None);
        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("pkg.Svc.Method"),
        });
        session.request.editor.set_text("");
        for ch in r#"{"a":1}"#.chars() {
            input(&mut session, Input::Edit(EditOp::Insert(ch)));
        }
        input(&mut session, Input::Format);
        assert_eq!(session.request.editor.text(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn toggle_description_requires_schema() {
        let mut session = Session::new(None);
        input(&mut session, Input::ToggleDescription);
        assert!(!session.request.show_schema);

        session.handle(Message::MethodMetadataLoaded {
            epoch: NavEpoch::default(),
            metadata: metadata("pkg.Svc.Method"),
        });
        input(&mut session, Input::ToggleDescription);
        assert!(session.request.show_schema);
    }

    #[test]
    fn error_keeps_view_and_sets_error_message() {
        let mut session = Session::new(None);
        let commands = session.handle(Message::Err {
            cause: "boom".to_owned(),
        });
        assert_eq!(session.view(), View::ServicesList);
        assert_eq!(
            commands,
            vec![Command::Status(StatusUpdate::error_message("boom"))]
        );
    }

    #[test]
    fn status_messages_update_status_line() {
        let mut session = Session::new(None);
        session.handle(Message::Status(StatusUpdate::loading()));
        session.handle(Message::Status(StatusUpdate::success_message("OK")));
        assert_eq!(session.status.status, "Loading");
        assert_eq!(
            session.status.message.as_ref().map(|message| message.kind),
            Some(MessageKind::Success)
        );
    }

    #[test]
    fn streamed_responses_accumulate_and_request_next_event() {
        let mut session = session_on_response();
        let invocation = InvocationId::new(1);

        for event in [
            InvocationEvent::MethodResolved,
            InvocationEvent::HeadersSent,
            InvocationEvent::HeadersReceived,
        ] {
            assert_eq!(
                session.handle(Message::Invocation { invocation, event }),
                vec![Command::AwaitInvocationEvent(invocation)]
            );
        }
        for payload in ["{\"n\": 1}", "{\"n\": 2}"] {
            session.handle(Message::Invocation {
                invocation,
                event: InvocationEvent::ResponseReceived {
                    payload: payload.to_owned(),
                },
            });
        }
        assert_eq!(session.response.chunks.len(), 2);
        assert_eq!(session.response.body(), "{\"n\": 1}\n{\"n\": 2}");

        let commands = session.handle(Message::Invocation {
            invocation,
            event: InvocationEvent::TrailersReceived {
                status: "OK".to_owned(),
            },
        });
        assert_eq!(
            commands,
            vec![Command::Status(StatusUpdate::success_message("OK"))]
        );
        assert_eq!(session.active_invocation(), None);
    }

    #[test]
    fn non_ok_trailers_and_errors_become_error_messages() {
        let mut session = session_on_response();
        let commands = session.handle(Message::Invocation {
            invocation: InvocationId::new(1),
            event: InvocationEvent::TrailersReceived {
                status: "NotFound".to_owned(),
            },
        });
        assert_eq!(
            commands,
            vec![Command::Status(StatusUpdate::error_message("NotFound"))]
        );

        let mut failed = session_on_response();
        let commands = failed.handle(Message::Invocation {
            invocation: InvocationId::new(1),
            event: InvocationEvent::Error {
                cause: "transport closed".to_owned(),
            },
        });
        assert_eq!(
            commands,
            vec![Command::Status(StatusUpdate::error_message(
                "transport closed"
            ))]
        );
        assert_eq!(failed.view(), View::ResponseViewer);
    }

    #[test]
    fn events_from_cancelled_invocation_are_ignored() {
        let mut session = session_on_response();
        input(&mut session, Input::Back);

        let commands = session.handle(Message::Invocation {
            invocation: InvocationId::new(1),
            event: InvocationEvent::ResponseReceived {
                payload: "{}".to_owned(),
            },
        });
        assert!(commands.is_empty());
        assert!(session.response.chunks.is_empty());
        assert_eq!(session.view(), View::RequestEditor);
    }

    #[test]
    fn resend_returns_to_editor_and_reissues() {
        let mut session = session_on_response();
        let commands = input(&mut session, Input::Resend);
        assert_eq!(
            commands,
            vec![Command::Status(StatusUpdate::ClearMessage), Command::Resend]
        );
        assert_eq!(session.view(), View::RequestEditor);

        session.handle(Message::InvocationStarted {
            invocation: InvocationId::new(2),
            method: "pkg.Svc.Method".to_owned(),
        });
        assert_eq!(session.view(), View::ResponseViewer);
        assert_eq!(session.active_invocation(), Some(InvocationId::new(2)));
    }

    #[test]
    fn resend_outside_response_is_ignored() {
        let mut session = Session::new(None);
        assert!(input(&mut session, Input::Resend).is_empty());
        assert_eq!(session.view(), View::ServicesList);
    }

    #[test]
    fn resize_never_exceeds_terminal_height() {
        for height in [0_u16, 1, 2, 5, 40] {
            let mut session = Session::new(None);
            session.request.show_schema = true;
            session.handle(Message::Resize(Area::new(80, height)));
            for view in View::ALL {
                let rows = session.screen(view).area().height + session.status.area.height;
                assert!(rows <= height, "{view:?} uses {rows} rows of {height}");
            }
            assert!(session.request.editor_height() <= height);
            assert!(session.response.body_height() <= height);
        }
    }

    #[test]
    fn resize_reserves_one_row_for_status() {
        let mut session = Session::new(None);
        session.handle(Message::Resize(Area::new(120, 30)));
        assert_eq!(session.status.area, Area::new(120, 1));
        for view in View::ALL {
            assert_eq!(session.screen(view).area(), Area::new(120, 29));
        }
    }
}
