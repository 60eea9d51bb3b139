use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use radix_mux::{
    endpoint::make_sync,
    error::RouteError,
    handler,
    http::{Method, StatusCode},
    route::{Mux, MuxConfig, METHOD_WILD},
    test::TestClient,
    web::Path,
    Endpoint, Request,
};

const METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE", "CUSTOM",
];

fn method(name: &str) -> Method {
    Method::from_bytes(name.as_bytes()).unwrap()
}

fn ok() -> impl Endpoint {
    make_sync(|_| ())
}

fn flag() -> (Arc<AtomicBool>, impl Endpoint) {
    let hit = Arc::new(AtomicBool::new(false));
    let ep = {
        let hit = hit.clone();
        make_sync(move |_| hit.store(true, Ordering::SeqCst))
    };
    (hit, ep)
}

#[handler]
async fn user_name(req: &Request) -> String {
    req.path_param("name").unwrap_or_default().to_string()
}

#[handler]
async fn user_id(Path(id): Path<u32>, method: Method) -> String {
    format!("{} {}", method, id)
}

#[tokio::test]
async fn param() {
    let mut mux = Mux::new();
    mux.get("/user/{name}", user_name).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.get("/user/gopher").send().await;
    resp.assert_status_is_ok();
    resp.assert_text("gopher").await;
}

#[tokio::test]
async fn typed_param() {
    let mut mux = Mux::new();
    mux.delete("/users/{id:[0-9]+}", user_id).unwrap();
    let cli = TestClient::new(mux);

    cli.delete("/users/42")
        .send()
        .await
        .assert_text("DELETE 42")
        .await;
    cli.delete("/users/abc")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn all_methods() {
    let mut mux = Mux::new();
    mux.get("/GET", make_sync(|_| "GET")).unwrap();
    mux.head("/HEAD", make_sync(|_| "HEAD")).unwrap();
    mux.post("/POST", make_sync(|_| "POST")).unwrap();
    mux.put("/PUT", make_sync(|_| "PUT")).unwrap();
    mux.patch("/PATCH", make_sync(|_| "PATCH")).unwrap();
    mux.delete("/DELETE", make_sync(|_| "DELETE")).unwrap();
    mux.connect("/CONNECT", make_sync(|_| "CONNECT")).unwrap();
    mux.options("/OPTIONS", make_sync(|_| "OPTIONS")).unwrap();
    mux.trace("/TRACE", make_sync(|_| "TRACE")).unwrap();
    mux.handle("CUSTOM", "/CUSTOM", make_sync(|_| "CUSTOM"))
        .unwrap();
    mux.any("/ANY", make_sync(|req| format!("ANY {}", req.method())))
        .unwrap();
    let cli = TestClient::new(mux);

    for name in METHODS {
        cli.request(method(name), format!("/{}", name))
            .send()
            .await
            .assert_text(*name)
            .await;
    }

    for name in METHODS {
        cli.request(method(name), "/ANY")
            .send()
            .await
            .assert_text(format!("ANY {}", name))
            .await;
    }
}

#[test]
fn invalid_input() {
    let mut mux = Mux::new();
    assert_eq!(mux.handle("", "/", ok()), Err(RouteError::EmptyMethod));
    assert_eq!(
        mux.get("", ok()),
        Err(RouteError::InvalidPath(String::new()))
    );
    assert_eq!(
        mux.get("noSlashRoot", ok()),
        Err(RouteError::InvalidPath("noSlashRoot".to_string()))
    );
    assert!(matches!(
        mux.get("/{id:[0-9}", ok()),
        Err(RouteError::InvalidRegex { .. })
    ));
    assert_eq!(
        mux.get("/static/{path:*}/x", ok()),
        Err(RouteError::WildcardNotLast("/static/{path:*}/x".to_string()))
    );
}

#[tokio::test]
async fn regex_values_through_nested_merges() {
    let mut id = Mux::new();
    id.get(
        "/click",
        make_sync(|req| req.path_param("id").unwrap_or_default().to_string()),
    )
    .unwrap();

    let mut v4 = Mux::new();
    v4.merge("/{id:^[1-9]\\d*}", id).unwrap();

    let mut mux = Mux::new();
    mux.get("/metrics", ok()).unwrap();
    mux.merge("/v4", v4).unwrap();
    let cli = TestClient::new(mux);

    cli.get("/v4/123/click")
        .send()
        .await
        .assert_text("123")
        .await;
    cli.get("/v4/0123/click")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
    cli.get("/metrics").send().await.assert_status_is_ok();
}

#[tokio::test]
async fn chaining() {
    let (foo_hit, foo) = flag();
    let (bar_hit, bar) = flag();

    let mut router2 = Mux::new();
    router2.post("/bar", bar).unwrap();

    let mut router1 = Mux::new();
    router1.post("/foo", foo).unwrap();
    router1.not_found(router2);
    let cli = TestClient::new(router1);

    cli.post("/foo").send().await.assert_status_is_ok();
    assert!(foo_hit.load(Ordering::SeqCst));

    cli.post("/bar").send().await.assert_status_is_ok();
    assert!(bar_hit.load(Ordering::SeqCst));

    cli.post("/qax")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn automatic_options() {
    let mut mux = Mux::new();
    mux.post("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    for path in ["*", "/path"] {
        let resp = cli.options(path).send().await;
        resp.assert_status_is_ok();
        resp.assert_header("allow", "OPTIONS, POST");
    }
    cli.options("/doesnotexist")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let mut mux = Mux::new();
    mux.post("/path", ok()).unwrap();
    mux.get("/path", ok()).unwrap();
    mux.global_options(make_sync(|_| StatusCode::NO_CONTENT));
    let (custom_hit, custom) = flag();
    mux.options("/path", custom).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.options("*").send().await;
    resp.assert_status(StatusCode::NO_CONTENT);
    resp.assert_header("allow", "GET, OPTIONS, POST");
    assert!(!custom_hit.load(Ordering::SeqCst));

    cli.options("/path").send().await.assert_status_is_ok();
    assert!(custom_hit.load(Ordering::SeqCst));
}

#[tokio::test]
async fn automatic_options_disabled() {
    let mut mux = Mux::with_config(MuxConfig {
        handle_options: false,
        ..MuxConfig::default()
    });
    mux.post("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.options("/path").send().await;
    resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    resp.assert_header("allow", "OPTIONS, POST");
}

#[tokio::test]
async fn method_not_allowed() {
    let mut mux = Mux::new();
    mux.post("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.get("/path").send().await;
    resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    resp.assert_header("allow", "OPTIONS, POST");

    let mut mux = Mux::new();
    mux.post("/path", ok()).unwrap();
    mux.delete("/path", ok()).unwrap();
    mux.options("/path", ok()).unwrap();
    mux.any("/other", ok()).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.get("/path").send().await;
    resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    resp.assert_header("allow", "DELETE, OPTIONS, POST");

    let mut mux = Mux::new();
    mux.post("/path", ok()).unwrap();
    mux.delete("/path", ok()).unwrap();
    mux.method_not_allowed(make_sync(|_| (StatusCode::IM_A_TEAPOT, "custom method")));
    let cli = TestClient::new(mux);

    let resp = cli.get("/path").send().await;
    resp.assert_status(StatusCode::IM_A_TEAPOT);
    resp.assert_header("allow", "DELETE, OPTIONS, POST");
    resp.assert_text("custom method").await;

    let mut mux = Mux::with_config(MuxConfig {
        handle_method_not_allowed: false,
        ..MuxConfig::default()
    });
    mux.post("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.get("/path").send().await;
    resp.assert_status(StatusCode::NOT_FOUND);
    resp.assert_header_is_not_exist("allow");
}

async fn check_not_found(register: &str, req_method: &str) {
    let mut mux = Mux::new();
    for pattern in [
        "/path",
        "/dir/",
        "/",
        "/{proc}/StaTus",
        "/USERS/{name}/enTRies/",
        "/static/{filepath:*}",
    ] {
        mux.handle(register, pattern, ok()).unwrap();
    }
    let (not_found_hit, not_found) = flag();
    let cli = TestClient::new(mux);

    let redirect = match req_method {
        "CONNECT" => StatusCode::NOT_FOUND,
        "GET" => StatusCode::MOVED_PERMANENTLY,
        _ => StatusCode::PERMANENT_REDIRECT,
    };

    let mut cases = vec![("/../path", redirect, "/path"), ("/nope", StatusCode::NOT_FOUND, "")];
    if register != "CONNECT" {
        cases.extend([
            ("/path/", redirect, "/path"),
            ("/dir", redirect, "/dir/"),
            ("/PATH", redirect, "/path"),
            ("/DIR/", redirect, "/dir/"),
            ("/PATH/", redirect, "/path"),
            ("/DIR", redirect, "/dir/"),
            ("/paTh/?name=foo", redirect, "/path?name=foo"),
            ("/paTh?name=foo", redirect, "/path?name=foo"),
            ("/sergio/status/", redirect, "/sergio/StaTus"),
            ("/users/atreugo/eNtriEs", redirect, "/USERS/atreugo/enTRies/"),
            ("/STatiC/test.go", redirect, "/static/test.go"),
        ]);
    }

    for (path, status, location) in cases {
        let resp = cli.request(method(req_method), path).send().await;
        assert_eq!(
            resp.0.status(),
            status,
            "{} {} registered as {}",
            req_method,
            path,
            register
        );
        if status != StatusCode::NOT_FOUND {
            resp.assert_header("location", location);
        }
    }

    let mut mux = Mux::new();
    mux.handle(register, "/path", ok()).unwrap();
    mux.not_found(not_found);
    let cli = TestClient::new(mux);
    cli.request(method(req_method), "/nope")
        .send()
        .await
        .assert_status_is_ok();
    assert!(not_found_hit.load(Ordering::SeqCst));
}

#[tokio::test]
async fn not_found_and_redirects() {
    for name in METHODS {
        check_not_found(name, name).await;
    }
    for name in METHODS {
        check_not_found(METHOD_WILD, name).await;
    }
}

#[tokio::test]
async fn redirect_keeps_method_and_query() {
    let mut mux = Mux::new();
    mux.patch("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    let resp = cli.patch("/path/?key=val").send().await;
    resp.assert_status(StatusCode::PERMANENT_REDIRECT);
    resp.assert_header("location", "/path?key=val");
}

#[tokio::test]
async fn no_root_node() {
    let mut mux = Mux::new();
    mux.get("/a", ok()).unwrap();
    let cli = TestClient::new(mux);

    cli.patch("/").send().await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redirects_disabled() {
    let mut mux = Mux::with_config(MuxConfig {
        redirect_trailing_slash: false,
        redirect_fixed_path: false,
        ..MuxConfig::default()
    });
    mux.get("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    cli.get("/path/").send().await.assert_status(StatusCode::NOT_FOUND);
    cli.get("/PATH").send().await.assert_status(StatusCode::NOT_FOUND);

    let mut mux = Mux::with_config(MuxConfig {
        redirect_trailing_slash: false,
        ..MuxConfig::default()
    });
    mux.get("/path", ok()).unwrap();
    let cli = TestClient::new(mux);

    cli.get("/path/").send().await.assert_status(StatusCode::NOT_FOUND);
    cli.get("/PATH/").send().await.assert_status(StatusCode::NOT_FOUND);
    let resp = cli.get("/PATH").send().await;
    resp.assert_status(StatusCode::MOVED_PERMANENTLY);
    resp.assert_header("location", "/path");
}

#[tokio::test]
async fn wild_method_fallback() {
    let mut mux = Mux::new();
    mux.any("/{path:*}", make_sync(|_| "any")).unwrap();
    mux.post("/specific", make_sync(|_| "post")).unwrap();
    for (idx, name) in METHODS.iter().enumerate() {
        mux.handle(name, &format!("/{}", idx), ok()).unwrap();
    }
    let cli = TestClient::new(mux);

    for name in METHODS {
        let resp = cli.request(method(name), "/specific").send().await;
        resp.assert_status_is_ok();
        resp.assert_text(if *name == "POST" { "post" } else { "any" })
            .await;
    }
}

#[tokio::test]
async fn panic_handler() {
    let handled = Arc::new(AtomicBool::new(false));

    let mut mux = Mux::new();
    {
        let handled = handled.clone();
        mux.on_panic(move |_| {
            handled.store(true, Ordering::SeqCst);
            StatusCode::INTERNAL_SERVER_ERROR.into()
        });
    }
    mux.put(
        "/user/{name}",
        make_sync(|_| -> &'static str { panic!("oops!") }),
    )
    .unwrap();
    let cli = TestClient::new(mux);

    cli.put("/user/gopher")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(handled.load(Ordering::SeqCst));
}

#[tokio::test]
#[should_panic(expected = "oops!")]
async fn panic_without_handler() {
    let mut mux = Mux::new();
    mux.disable_panic_handler();
    mux.get("/", make_sync(|_| -> &'static str { panic!("oops!") }))
        .unwrap();
    TestClient::new(mux).get("/").send().await;
}

#[test]
fn list() {
    let mut mux = Mux::new();
    mux.get("/bar", ok()).unwrap();
    mux.patch("/foo", ok()).unwrap();

    let mut v1 = Mux::new();
    v1.post("/users/{name}/{surname?}", ok()).unwrap();
    v1.delete("/users/{id?}", ok()).unwrap();
    mux.merge("/v1", v1).unwrap();

    let list = mux
        .list()
        .map(|(method, patterns)| (method.to_string(), patterns.to_vec()))
        .collect::<Vec<_>>();
    fn strings(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(ToString::to_string).collect()
    }

    let expected = vec![
        ("GET".to_string(), strings(&["/bar"])),
        ("PATCH".to_string(), strings(&["/foo"])),
        (
            "POST".to_string(),
            strings(&["/v1/users/{name}", "/v1/users/{name}/{surname}"]),
        ),
        (
            "DELETE".to_string(),
            strings(&["/v1/users", "/v1/users/{id}"]),
        ),
    ];
    assert_eq!(list, expected);
}

#[tokio::test]
async fn same_prefix_param_routes() {
    fn params() -> impl Endpoint {
        make_sync(|req| {
            req.path_params()
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    let mut v1 = Mux::new();
    v1.get("/foo/{id}/{pageSize}/{page}", params()).unwrap();
    v1.get("/foo/{id}/{iid}", params()).unwrap();
    v1.get("/foo/{id}", params()).unwrap();

    let mut mux = Mux::new();
    mux.merge("/v1", v1).unwrap();
    let cli = TestClient::new(mux);

    cli.get("/v1/foo/1/20/4")
        .send()
        .await
        .assert_text("id=1,pageSize=20,page=4")
        .await;
    cli.get("/v1/foo/2/3")
        .send()
        .await
        .assert_text("id=2,iid=3")
        .await;
    cli.get("/v1/foo/v3").send().await.assert_text("id=v3").await;
}

#[tokio::test]
async fn optional_params() {
    let mut mux = Mux::new();
    mux.get(
        "/show/{name}/{surname?}/at/{address?}/{id}/{phone?:.*}",
        make_sync(|req| req.path_params().len().to_string()),
    )
    .unwrap();
    let cli = TestClient::new(mux);

    for (path, captured) in [
        ("/show/john", "1"),
        ("/show/john/doe", "2"),
        ("/show/john/doe/at", "2"),
        ("/show/john/doe/at/main", "3"),
        ("/show/john/doe/at/main/7", "4"),
        ("/show/john/doe/at/main/7/555", "5"),
    ] {
        cli.get(path).send().await.assert_text(captured).await;

        let with_slash = format!("{}/", path);
        let resp = cli.get(with_slash.as_str()).send().await;
        resp.assert_status(StatusCode::MOVED_PERMANENTLY);
        resp.assert_header("location", path);
    }

    cli.get("/show").send().await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mount_endpoint() {
    let mut mux = Mux::new();
    mux.mount(
        "/files/{rest:*}",
        make_sync(|req| format!("{} {}", req.method(), req.uri().path())),
    )
    .unwrap();
    let cli = TestClient::new(mux);

    cli.get("/files/a/b.txt")
        .send()
        .await
        .assert_text("GET /a/b.txt")
        .await;
    cli.put("/files/c")
        .send()
        .await
        .assert_text("PUT /c")
        .await;
}

#[tokio::test]
async fn mutable_replace() {
    let mux = Arc::new({
        let mut mux = Mux::with_config(MuxConfig {
            mutable: true,
            ..MuxConfig::default()
        });
        mux.get("/version", make_sync(|_| "v1")).unwrap();
        mux
    });
    let cli = TestClient::new(mux.clone());

    cli.get("/version").send().await.assert_text("v1").await;
    mux.replace("GET", "/version", make_sync(|_| "v2")).unwrap();
    cli.get("/version").send().await.assert_text("v2").await;
}
