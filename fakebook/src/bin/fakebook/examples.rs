use crate::commands::{admin, demo, friend, post, user};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "user",
            groups: user::EXAMPLES,
        },
        CommandExample {
            name: "friend",
            groups: friend::EXAMPLES,
        },
        CommandExample {
            name: "post",
            groups: post::EXAMPLES,
        },
        CommandExample {
            name: "admin",
            groups: admin::EXAMPLES,
        },
        CommandExample {
            name: "demo",
            groups: demo::EXAMPLES,
        },
    ]
}
