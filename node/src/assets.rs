//! Embedded portal assets. The page drives the JSON routes directly; the
//! credential fields travel in custom request headers, never in a body.

pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Air Sensor Setup</title>
  <link rel="stylesheet" href="/style.css">
</head>
<body>
  <h1>Air Sensor Setup</h1>
  <p class="muted">Join the sensor to your WiFi network, then register it.</p>

  <div class="card">
    <h2>Networks</h2>
    <ul id="apList"><li class="muted">Scanning...</li></ul>
    <label>SSID</label><input id="ssid" type="text" maxlength="32">
    <label>Password</label><input id="password" type="password" maxlength="64">
    <button id="join">Join</button>
    <button id="forget">Forget Network</button>
    <p>Connection: <span id="ipInfo">--</span></p>
  </div>

  <div class="card">
    <h2>Registration</h2>
    <label>Name</label><input id="name" type="text" maxlength="64">
    <label>Email</label><input id="email" type="text" maxlength="64">
    <button id="register">Register Sensor</button>
    <p id="regInfo" class="muted"></p>
  </div>

  <p id="status" class="muted"></p>

  <script src="/jquery.js"></script>
  <script src="/code.js"></script>
</body>
</html>
"#;

pub const STYLE_CSS: &str = r#"body{font-family:Arial,sans-serif;max-width:680px;margin:2rem auto;padding:0 1rem;color:#111}
h1{margin:0 0 .5rem}
.card{border:1px solid #ddd;border-radius:10px;padding:1rem;margin-bottom:1rem}
label{display:block;margin:.5rem 0 .2rem}
input[type=text],input[type=password]{width:100%;padding:.5rem;box-sizing:border-box}
button{padding:.55rem .9rem;margin-top:.8rem}
ul{list-style:none;padding:0}
li{padding:.25rem 0;cursor:pointer}
li:hover{text-decoration:underline}
.muted{color:#555}.ok{color:#106010}.err{color:#a00000}
"#;

pub const JQUERY_JS: &str = r#"// Minimal helper in place of the full jQuery build.
(function(){
  function wrap(el){
    return {
      el: el,
      text: function(v){ el.textContent = v; return this; },
      html: function(v){ el.innerHTML = v; return this; },
      val: function(){ return el.value; },
      cls: function(v){ el.className = v; return this; },
      on: function(ev, fn){ el.addEventListener(ev, fn); return this; }
    };
  }
  window.$ = function(id){ return wrap(document.getElementById(id)); };
  window.$.getJSON = function(path, ok, err){
    fetch(path).then(function(r){
      if(!r.ok) throw new Error('HTTP ' + r.status);
      return r.json();
    }).then(ok).catch(err || function(){});
  };
  window.$.send = function(method, path, headers, ok, err){
    fetch(path, {method: method, headers: headers || {}}).then(function(r){
      if(!r.ok) throw new Error('HTTP ' + r.status);
      ok(r);
    }).catch(err || function(){});
  };
})();
"#;

pub const CODE_JS: &str = r#"function setStatus(kind, message){ $('status').cls(kind).text(message); }

function refreshApList(){
  $.getJSON('/ap.json', function(aps){
    var items = aps.map(function(ap){
      return '<li data-ssid="' + ap.ssid + '">' + ap.ssid + ' (' + ap.rssi + ' dBm)</li>';
    });
    $('apList').html(items.join('') || '<li class="muted">No networks found</li>');
    Array.prototype.forEach.call($('apList').el.children, function(item){
      item.addEventListener('click', function(){ document.getElementById('ssid').value = item.dataset.ssid || ''; });
    });
  }, function(){ /* scan still running; keep the last list */ });
}

function refreshStatus(){
  $.getJSON('/status.json', function(info){
    $('ipInfo').text(info.ip ? info.ip : 'not connected');
  }, function(){ $('ipInfo').text('not connected'); });
}

function refreshRegistration(){
  $.getJSON('/register.json', function(info){
    $('regInfo').text('Registered to ' + info.name + ' <' + info.email + '>');
  }, function(){ $('regInfo').text('Not registered yet.'); });
}

$('join').on('click', function(){
  setStatus('muted', 'Joining...');
  $.send('POST', '/connect.json', {
    'X-Custom-ssid': $('ssid').val(),
    'X-Custom-pwd': $('password').val()
  }, function(){ setStatus('ok', 'Connect requested.'); },
     function(){ setStatus('err', 'Join rejected; check SSID and password lengths.'); });
});

$('forget').on('click', function(){
  $.send('DELETE', '/connect.json', {},
    function(){ setStatus('ok', 'Network forgotten.'); });
});

$('register').on('click', function(){
  setStatus('muted', 'Registering...');
  $.send('POST', '/register.json', {
    'X-Custom-name': $('name').val(),
    'X-Custom-email': $('email').val()
  }, function(){ setStatus('ok', 'Registered.'); refreshRegistration(); },
     function(){ setStatus('err', 'Registration rejected; check the field lengths.'); });
});

refreshApList();
refreshStatus();
refreshRegistration();
setInterval(refreshApList, 10000);
setInterval(refreshStatus, 5000);
"#;
