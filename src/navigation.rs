use std::collections::{HashMap, HashSet};

use crate::{
    auth::{RoleSet, roles_satisfy},
    models::{Audience, CustomPage, Menu, MenuItem, NavigationConfig, NavigationType},
};

/// build_menu
///
/// Assembles the menu for one audience.
///
/// Navigation entries are listed by their visibility flags alone; their role
/// restrictions are enforced when the page itself is requested. Custom pages are
/// listed when active, shown in navigation, not hidden, and reachable with
/// `caller_roles`.
///
/// A navigation entry sharing its key with any custom page is left out, listed
/// or not: requests for that key resolve to the custom page, so the custom
/// page's own rules decide whether the key appears.
///
/// Custom pages nest through `parent_page_key`:
/// - a parent that does not exist at all puts the child at the top level;
/// - a parent that exists but is excluded from this menu excludes its subtree;
/// - pages only reachable through a parent cycle are dropped.
pub fn build_menu(
    custom_pages: &[CustomPage],
    entries: &[NavigationConfig],
    audience: Audience,
    caller_roles: Option<&RoleSet>,
) -> Menu {
    let all_keys: HashSet<&str> = custom_pages.iter().map(|p| p.page_key.as_str()).collect();

    let listed: Vec<&CustomPage> = custom_pages
        .iter()
        .filter(|page| {
            page.is_active
                && page.show_in_navigation
                && page.navigation_type != NavigationType::Hidden
                && roles_satisfy(caller_roles, &page.required_role_set())
        })
        .collect();

    let mut footer: Vec<MenuItem> = listed
        .iter()
        .filter(|page| page.navigation_type == NavigationType::Footer)
        .map(|page| leaf(page))
        .collect();
    sort_items(&mut footer);

    let tree_pages: Vec<&CustomPage> = listed
        .into_iter()
        .filter(|page| page.navigation_type != NavigationType::Footer)
        .collect();
    let tree_keys: HashSet<&str> = tree_pages.iter().map(|p| p.page_key.as_str()).collect();

    let mut children: HashMap<&str, Vec<&CustomPage>> = HashMap::new();
    let mut roots: Vec<&CustomPage> = Vec::new();
    for page in tree_pages.iter().copied() {
        match page.parent_page_key.as_deref() {
            Some(parent) if parent != page.page_key && tree_keys.contains(parent) => {
                children.entry(parent).or_default().push(page);
            }
            // Parent exists but is not part of this menu.
            Some(parent) if parent != page.page_key && all_keys.contains(parent) => {}
            _ => roots.push(page),
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut main: Vec<MenuItem> = roots
        .into_iter()
        .filter_map(|page| subtree(page, &children, &mut visited))
        .collect();

    main.extend(
        entries
            .iter()
            .filter(|entry| entry.is_active && entry.is_visible_to(audience))
            .filter(|entry| !all_keys.contains(entry.page_key.to_lowercase().as_str()))
            .map(|entry| MenuItem {
                page_key: entry.page_key.clone(),
                display_name: entry.display_name.clone(),
                href: href(&entry.page_key),
                sort_order: entry.sort_order_for(audience),
                children: Vec::new(),
            }),
    );
    sort_items(&mut main);

    Menu { main, footer }
}

fn subtree<'a>(
    page: &'a CustomPage,
    children: &HashMap<&str, Vec<&'a CustomPage>>,
    visited: &mut HashSet<&'a str>,
) -> Option<MenuItem> {
    if !visited.insert(page.page_key.as_str()) {
        return None;
    }

    let mut item = leaf(page);
    if let Some(kids) = children.get(page.page_key.as_str()) {
        item.children = kids
            .iter()
            .copied()
            .filter_map(|child| subtree(child, children, visited))
            .collect();
        sort_items(&mut item.children);
    }
    Some(item)
}

fn leaf(page: &CustomPage) -> MenuItem {
    MenuItem {
        page_key: page.page_key.clone(),
        display_name: page.display_name.clone(),
        href: href(&page.page_key),
        sort_order: page.sort_order,
        children: Vec::new(),
    }
}

fn href(key: &str) -> String {
    format!("/{}", key)
}

fn sort_items(items: &mut [MenuItem]) {
    items.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.page_key.cmp(&b.page_key))
    });
}
