use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, Sizable,
    button::{Button, ButtonVariants},
    input::{Input, InputEvent, InputState},
    label::Label,
    v_flex,
};

use crate::session::{SessionChanged, SessionManager, SignInFailed};

const CARD_WIDTH: Pixels = px(380.);
const MISSING_CREDENTIALS_MESSAGE: &str = "Podaj adres e-mail i hasło.";

/// Centered sign-in card shown while no session exists.
pub struct LoginView {
    session_manager: Entity<SessionManager>,
    email_input: Entity<InputState>,
    password_input: Entity<InputState>,
    error_line: Option<String>,
    signing_in: bool,
}

impl LoginView {
    pub fn new(
        session_manager: Entity<SessionManager>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let email_input = cx.new(|cx| InputState::new(window, cx).placeholder("E-mail"));
        let password_input =
            cx.new(|cx| InputState::new(window, cx).placeholder("Hasło").masked(true));

        cx.subscribe_in(
            &password_input,
            window,
            |this, _, event: &InputEvent, _window, cx| {
                if let InputEvent::PressEnter { .. } = event {
                    this.handle_submit(cx);
                }
            },
        )
        .detach();

        cx.subscribe(&session_manager, |this, _, event: &SignInFailed, cx| {
            this.signing_in = false;
            this.error_line = Some(event.message.clone());
            cx.notify();
        })
        .detach();

        cx.subscribe(&session_manager, |this, _, _: &SessionChanged, cx| {
            this.signing_in = false;
            this.error_line = None;
            cx.notify();
        })
        .detach();

        Self {
            session_manager,
            email_input,
            password_input,
            error_line: None,
            signing_in: false,
        }
    }

    fn handle_submit(&mut self, cx: &mut Context<Self>) {
        if self.signing_in {
            return;
        }

        let email = self.email_input.read(cx).value().trim().to_string();
        let password = self.password_input.read(cx).value().to_string();

        if email.is_empty() || password.trim().is_empty() {
            self.error_line = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
            cx.notify();
            return;
        }

        self.signing_in = true;
        self.error_line = None;
        self.session_manager.update(cx, |manager, cx| {
            manager.sign_in(email, password, cx);
        });
        cx.notify();
    }

    fn render_field(&self, input: &Entity<InputState>, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        div()
            .w_full()
            .px_3()
            .py_2()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.background)
            .child(Input::new(input).w_full())
    }
}

impl Render for LoginView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let button_label = if self.signing_in {
            "Logowanie..."
        } else {
            "Zaloguj się"
        };

        div()
            .id("login-view")
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(
                v_flex()
                    .w(CARD_WIDTH)
                    .gap_3()
                    .p_6()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .child(
                        div()
                            .w_full()
                            .text_xl()
                            .font_weight(FontWeight::MEDIUM)
                            .text_color(theme.foreground)
                            .child("Zaloguj się do czatu"),
                    )
                    .child(self.render_field(&self.email_input, cx))
                    .child(self.render_field(&self.password_input, cx))
                    .when_some(self.error_line.clone(), |column, error_line| {
                        column.child(
                            Label::new(error_line)
                                .text_xs()
                                .text_color(theme.danger),
                        )
                    })
                    .child(
                        div().w_full().flex().justify_end().child(
                            Button::new("sign-in")
                                .small()
                                .primary()
                                .child(button_label)
                                .on_click(cx.listener(|this, _, _window, cx| {
                                    this.handle_submit(cx);
                                })),
                        ),
                    ),
            )
    }
}
