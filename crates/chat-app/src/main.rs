use std::sync::Arc;

use asystent::app::{AppShell, Quit};
use asystent::config::AppConfig;
use asystent::session::SessionCache;
use asystent_assistant::{Assistant, WebhookAssistant};
use asystent_backend::{AuthClient, Backend, BackendClient, RestStore};
use gpui::*;
use gpui_component::Root;

/// Application entry point.
///
/// Bootstraps the GPUI application with:
/// 1. Configuration resolution (TOML file + environment)
/// 2. One backend client, auth client and webhook assistant for the whole
///    process, injected into the shell
/// 3. gpui-component initialization (required for Root and themes)
/// 4. Window creation with Root wrapper for gpui-component composition
fn main() {
    // Initialize tracing for development debugging
    tracing_subscriber::fmt::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("failed to load configuration: {error}");
            return;
        }
    };

    let backend_client = match BackendClient::new(&config.backend_url, &config.backend_api_key) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!("invalid backend configuration: {error}");
            return;
        }
    };

    let assistant: Arc<dyn Assistant> = match WebhookAssistant::new(&config.webhook_url) {
        Ok(assistant) => Arc::new(assistant),
        Err(error) => {
            tracing::error!("invalid webhook configuration: {error}");
            return;
        }
    };

    let auth = Arc::new(AuthClient::new(backend_client.clone()));
    let store: Arc<dyn Backend> = Arc::new(RestStore::new(backend_client, auth.session_handle()));

    // Create application with bundled assets
    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Initialize gpui-component - REQUIRED before any Root usage
        // This sets up the theme system and component registry
        gpui_component::init(cx);

        // Quit action: cleanly shut down the application
        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([KeyBinding::new("cmd-q", Quit, None)]);

        // Spawn async window creation to ensure all initialization is complete
        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(1200.), px(800.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    // Match Zed-style client decorations on Linux/FreeBSD so the app draws
                    // its own title area instead of showing a system titlebar.
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                // Open the main window with Root wrapper
                // Root is REQUIRED by gpui-component for dialogs/notifications
                cx.open_window(options, |window, cx| {
                    let shell = cx.new(|cx| {
                        AppShell::new(
                            auth,
                            store,
                            assistant,
                            SessionCache::new(SessionCache::default_path()),
                            window,
                            cx,
                        )
                    });

                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                // Activate the application
                cx.activate(true);
            })
        })
        .detach();
    });
}
