use leptos::prelude::*;
use leptos_router::{
    components::{A, Route, Router, Routes},
    path,
};

use crate::pages::{home::HomePage, timeline::TimelinePage};

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <div id="app">
                <header>
                    <h1>"Historical Events · Entities"</h1>
                    <nav>
                        <A href="/">"Records"</A>
                        <A href="/timeline">"Timeline"</A>
                    </nav>
                </header>
                <main>
                    <Routes fallback=|| {
                        view! { <p class="error">"Page not found"</p> }
                    }>
                        <Route path=path!("/") view=HomePage/>
                        <Route path=path!("/timeline") view=TimelinePage/>
                    </Routes>
                </main>
                <footer>
                    <p>"People, locations and organizations extracted from event descriptions"</p>
                </footer>
            </div>
        </Router>
    }
}
